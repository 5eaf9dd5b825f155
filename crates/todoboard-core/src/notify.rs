use std::sync::Arc;

use parking_lot::Mutex;
use todoboard_shared::{
  NotificationMessage,
  Severity
};
use tracing::{
  debug,
  trace
};

type Consumer =
  Arc<dyn Fn(&str, Severity) + Send + Sync>;

/// Single-slot notification channel.
///
/// Clones share the slot. Producers
/// hold a handle and call [`emit`];
/// whatever surface displays toasts
/// calls [`register`] once it is up.
/// Messages emitted while the slot is
/// empty are dropped, never queued.
///
/// [`emit`]: Notifier::emit
/// [`register`]: Notifier::register
#[derive(Clone, Default)]
pub struct Notifier {
  slot: Arc<Mutex<Option<Consumer>>>
}

impl std::fmt::Debug for Notifier {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    f.debug_struct("Notifier")
      .field(
        "registered",
        &self.is_registered()
      )
      .finish()
  }
}

impl Notifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces any previously
  /// registered consumer.
  pub fn register<F>(
    &self,
    consumer: F
  ) where
    F: Fn(&str, Severity)
      + Send
      + Sync
      + 'static
  {
    let replaced = self
      .slot
      .lock()
      .replace(Arc::new(consumer))
      .is_some();
    debug!(
      replaced,
      "notification consumer registered"
    );
  }

  pub fn is_registered(&self) -> bool {
    self.slot.lock().is_some()
  }

  pub fn emit(
    &self,
    message: &NotificationMessage
  ) {
    // Release the lock before calling
    // out; consumers may re-register.
    let consumer =
      self.slot.lock().clone();
    let severity =
      message.effective_severity();
    match consumer {
      | Some(consumer) => {
        debug!(
          %severity,
          message = %message.message,
          "emitting notification"
        );
        consumer(
          &message.message,
          severity
        );
      }
      | None => {
        trace!(
          message = %message.message,
          "no notification consumer; dropping"
        );
      }
    }
  }

  pub fn success(
    &self,
    text: impl Into<String>
  ) {
    self.emit(
      &NotificationMessage::with_severity(
        text,
        Severity::Success
      )
    );
  }

  pub fn info(
    &self,
    text: impl Into<String>
  ) {
    self.emit(
      &NotificationMessage::new(text)
    );
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;
  use todoboard_shared::{
    NotificationMessage,
    Severity
  };

  use super::Notifier;

  fn recorder(
    notifier: &Notifier
  ) -> Arc<Mutex<Vec<(String, Severity)>>>
  {
    let seen = Arc::new(Mutex::new(
      Vec::new()
    ));
    let sink = seen.clone();
    notifier.register(
      move |text, severity| {
        sink
          .lock()
          .push((text.to_string(), severity));
      }
    );
    seen
  }

  #[test]
  fn emit_before_register_is_dropped() {
    let notifier = Notifier::new();
    notifier.info("x");
    let seen = recorder(&notifier);
    assert!(seen.lock().is_empty());
  }

  #[test]
  fn forwards_verbatim_with_default_severity()
   {
    let notifier = Notifier::new();
    let seen = recorder(&notifier);
    notifier.emit(
      &NotificationMessage::new(
        "  spaced  "
      )
    );
    assert_eq!(
      seen.lock().as_slice(),
      &[(
        "  spaced  ".to_string(),
        Severity::Info
      )]
    );
  }

  #[test]
  fn last_registration_wins() {
    let notifier = Notifier::new();
    let first = recorder(&notifier);
    let second = recorder(&notifier);
    notifier.success("done");
    assert!(first.lock().is_empty());
    assert_eq!(second.lock().len(), 1);
    assert_eq!(
      second.lock()[0].1,
      Severity::Success
    );
  }

  #[test]
  fn clones_share_the_slot() {
    let notifier = Notifier::new();
    let producer = notifier.clone();
    let seen = recorder(&notifier);
    producer.info("from clone");
    assert_eq!(seen.lock().len(), 1);
  }

  #[test]
  fn consumer_may_reregister_while_handling()
   {
    let notifier = Notifier::new();
    let inner = notifier.clone();
    notifier.register(move |_, _| {
      inner.register(|_, _| {});
    });
    notifier.info("first");
    assert!(notifier.is_registered());
  }
}
