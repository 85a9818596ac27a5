use crate::transport::{MessageEvent, Transport, TransportCallbacks, TransportHandle};
use log::*;
use serde_json::Value;
use sse::codec;
use sse::message::UserKeys;
use sse::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Path of the subscription endpoint, relative to the server's base URL.
pub const SUBSCRIPTION_PATH: &str = "/sse/events";

pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// A transport handle exists. Covers both "connecting" and "connected".
    Connected,
}

struct Shared<H> {
    handle: Option<H>,
    /// Bumped on every connect and disconnect. Callbacks carry the value that
    /// was current when their handle was opened and go quiet once it moves on.
    generation: u64,
    on_message: Option<MessageHandler>,
    on_error: Option<ErrorHandler>,
}

fn lock<H>(shared: &Mutex<Shared<H>>) -> MutexGuard<'_, Shared<H>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client side of one subscription.
///
/// A session owns at most one transport handle. A transport error always
/// tears the session down after the error handler ran; reconnecting is up to
/// the owner of the session.
pub struct ClientSession<T: Transport> {
    endpoint: String,
    user_ids: UserKeys,
    transport: T,
    shared: Arc<Mutex<Shared<T::Handle>>>,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(endpoint: impl Into<String>, user_ids: impl Into<UserKeys>, transport: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_ids: user_ids.into(),
            transport,
            shared: Arc::new(Mutex::new(Shared {
                handle: None,
                generation: 0,
                on_message: None,
                on_error: None,
            })),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_ids(&self) -> &UserKeys {
        &self.user_ids
    }

    /// `{endpoint}/sse/events?userId=user1,user2`
    pub fn url(&self) -> String {
        format!(
            "{}{}?userId={}",
            self.endpoint.trim_end_matches('/'),
            SUBSCRIPTION_PATH,
            self.user_ids.to_query_param()
        )
    }

    pub fn state(&self) -> SessionState {
        if lock(&self.shared).handle.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Set the message handler, replacing any previous one.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        lock(&self.shared).on_message = Some(Arc::new(handler));
    }

    /// Set the error handler, replacing any previous one.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        lock(&self.shared).on_error = Some(Arc::new(handler));
    }

    /// Open the subscription. A session that is already connected closes its
    /// current handle first, so at most one handle is ever owned.
    pub fn connect(&self) -> Result<(), Error> {
        let url = self.url();

        let (previous, generation) = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            (shared.handle.take(), shared.generation)
        };

        if let Some(mut previous) = previous {
            info!("Replacing the open SSE connection to {}", url);
            previous.close();
        }

        debug!("Opening SSE connection to {}", url);
        let mut handle = self.transport.open(&url, self.callbacks(generation))?;

        let mut shared = lock(&self.shared);
        if shared.generation == generation {
            shared.handle = Some(handle);
        } else {
            // Torn down by an error delivered while the transport was opening
            drop(shared);
            handle.close();
        }

        Ok(())
    }

    /// Close the subscription if one is open. Safe to call repeatedly.
    pub fn disconnect(&self) {
        disconnect(&self.shared, None);
    }

    fn callbacks(&self, generation: u64) -> TransportCallbacks {
        let on_message_shared = Arc::downgrade(&self.shared);
        let on_error_shared = Arc::downgrade(&self.shared);

        TransportCallbacks {
            on_message: Box::new(move |event| {
                handle_message(&on_message_shared, generation, event)
            }),
            on_error: Box::new(move |error| handle_error(&on_error_shared, generation, error)),
        }
    }
}

impl<T: Transport> Drop for ClientSession<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Take and close the handle. With `only_generation`, do nothing unless the
/// session is still on that generation.
fn disconnect<H: TransportHandle>(shared: &Mutex<Shared<H>>, only_generation: Option<u64>) {
    let handle = {
        let mut shared = lock(shared);
        if only_generation.is_some_and(|generation| generation != shared.generation) {
            return;
        }
        shared.generation += 1;
        shared.handle.take()
    };

    if let Some(mut handle) = handle {
        debug!("Closing SSE connection");
        handle.close();
    }
}

fn handle_message<H: TransportHandle>(
    shared: &Weak<Mutex<Shared<H>>>,
    generation: u64,
    event: MessageEvent,
) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let (on_message, on_error) = {
        let shared = lock(&shared);
        if shared.generation != generation {
            trace!("Ignoring message from a replaced SSE connection");
            return;
        }
        (shared.on_message.clone(), shared.on_error.clone())
    };

    let Some(on_message) = on_message else {
        trace!("No message handler registered, dropping SSE message");
        return;
    };

    match codec::decode::<Value>(&event.data) {
        Ok(payload) => on_message(payload),
        Err(e) => {
            warn!("Dropping malformed SSE message: {e}");
            if let Some(on_error) = on_error {
                on_error(&e);
            }
        }
    }
}

fn handle_error<H: TransportHandle>(shared: &Weak<Mutex<Shared<H>>>, generation: u64, error: Error) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let on_error = {
        let shared = lock(&shared);
        if shared.generation != generation {
            trace!("Ignoring error from a replaced SSE connection: {error}");
            return;
        }
        shared.on_error.clone()
    };

    warn!("SSE transport error, disconnecting: {error}");
    if let Some(on_error) = on_error {
        on_error(&error);
    }

    disconnect(&shared, Some(generation));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Handle {}

        impl TransportHandle for Handle {
            fn close(&mut self);
        }
    }

    const BASE_URL: &str = "http://localhost:3000";

    /// Records every open and hands out handles that must be closed exactly once.
    #[derive(Default)]
    struct FakeTransport {
        opened: Mutex<Vec<String>>,
        callbacks: Mutex<Vec<Arc<TransportCallbacks>>>,
        fail_open: bool,
    }

    impl FakeTransport {
        fn failing() -> Self {
            Self {
                fail_open: true,
                ..Self::default()
            }
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }

        fn callbacks(&self, index: usize) -> Arc<TransportCallbacks> {
            Arc::clone(&self.callbacks.lock().unwrap()[index])
        }

        fn last_callbacks(&self) -> Arc<TransportCallbacks> {
            let callbacks = self.callbacks.lock().unwrap();
            Arc::clone(callbacks.last().expect("transport was never opened"))
        }
    }

    impl Transport for FakeTransport {
        type Handle = MockHandle;

        fn open(&self, url: &str, callbacks: TransportCallbacks) -> Result<MockHandle, Error> {
            if self.fail_open {
                return Err(Error::Transport(format!("cannot reach {url}")));
            }

            self.opened.lock().unwrap().push(url.to_string());
            self.callbacks.lock().unwrap().push(Arc::new(callbacks));

            let mut handle = MockHandle::new();
            handle.expect_close().times(1).return_const(());
            Ok(handle)
        }
    }

    impl Transport for Arc<FakeTransport> {
        type Handle = MockHandle;

        fn open(&self, url: &str, callbacks: TransportCallbacks) -> Result<MockHandle, Error> {
            self.as_ref().open(url, callbacks)
        }
    }

    fn session(user_ids: impl Into<UserKeys>) -> (ClientSession<Arc<FakeTransport>>, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        (
            ClientSession::new(BASE_URL, user_ids, Arc::clone(&transport)),
            transport,
        )
    }

    fn message(data: &str) -> MessageEvent {
        MessageEvent::new(data)
    }

    #[test]
    fn test_connect_uses_single_user_url() {
        let (session, transport) = session("user1");

        session.connect().unwrap();

        assert_eq!(
            transport.opened(),
            vec!["http://localhost:3000/sse/events?userId=user1"]
        );
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_connect_joins_multiple_users_in_order() {
        let transport = Arc::new(FakeTransport::default());
        let session = ClientSession::new("http://h", ["user1", "user2"], Arc::clone(&transport));

        session.connect().unwrap();

        assert_eq!(transport.opened(), vec!["http://h/sse/events?userId=user1,user2"]);
    }

    #[test]
    fn test_url_trims_trailing_slash_from_endpoint() {
        let session = ClientSession::new("http://h/", "user1", FakeTransport::default());
        assert_eq!(session.url(), "http://h/sse/events?userId=user1");
    }

    #[test]
    fn test_message_handler_receives_decoded_payload() {
        let (session, transport) = session("user1");
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        session.on_message(move |payload| sink.lock().unwrap().push(payload));

        session.connect().unwrap();
        (transport.last_callbacks().on_message)(message(r#"{"message":"Hello"}"#));

        assert_eq!(*received.lock().unwrap(), vec![json!({ "message": "Hello" })]);
    }

    #[test]
    fn test_new_message_handler_replaces_previous_one() {
        let (session, transport) = session("user1");
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        session.on_message(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        session.on_message(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();
        (transport.last_callbacks().on_message)(message("1"));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_message_reaches_error_handler_without_disconnecting() {
        let (session, transport) = session("user1");
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        session.on_message(|_| panic!("malformed data must not be delivered"));
        session.on_error(move |e| sink.lock().unwrap().push(e.clone()));

        session.connect().unwrap();
        (transport.last_callbacks().on_message)(message("{not json"));

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Parse(_)));
        assert!(session.is_connected());
    }

    #[test]
    fn test_message_without_handler_is_dropped() {
        let (session, transport) = session("user1");
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        session.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();
        (transport.last_callbacks().on_message)(message("{not json"));

        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert!(session.is_connected());
    }

    #[test]
    fn test_transport_error_invokes_handler_once_and_disconnects() {
        let (session, transport) = session("user1");
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        session.on_error(move |e| sink.lock().unwrap().push(e.clone()));

        session.connect().unwrap();
        (transport.last_callbacks().on_error)(Error::Transport("Connection error".to_string()));

        assert_eq!(
            *errors.lock().unwrap(),
            vec![Error::Transport("Connection error".to_string())]
        );
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_transport_error_without_handler_still_disconnects() {
        let (session, transport) = session("user1");

        session.connect().unwrap();
        (transport.last_callbacks().on_error)(Error::Transport("reset".to_string()));

        assert!(!session.is_connected());
    }

    #[test]
    fn test_repeated_transport_errors_only_tear_down_once() {
        let (session, transport) = session("user1");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        session.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();
        let callbacks = transport.last_callbacks();
        (callbacks.on_error)(Error::Transport("first".to_string()));
        (callbacks.on_error)(Error::Transport("second".to_string()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_error_keeps_session_connected() {
        let (session, _transport) = session("user1");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        session.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(session.is_connected());
    }

    #[test]
    fn test_disconnect_closes_handle_and_is_idempotent() {
        let (session, _transport) = session("user1");

        session.connect().unwrap();
        session.disconnect();
        session.disconnect();

        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_disconnect_before_connect_is_a_no_op() {
        let (session, transport) = session("user1");

        session.disconnect();

        assert!(transport.opened().is_empty());
        assert!(!session.is_connected());
    }

    #[test]
    fn test_second_connect_replaces_handle_and_silences_old_callbacks() {
        let (session, transport) = session("user1");
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        session.on_message(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();
        session.connect().unwrap();

        let stale = transport.callbacks(0);
        (stale.on_message)(message("1"));
        (stale.on_error)(Error::Transport("late".to_string()));

        assert_eq!(transport.opened().len(), 2);
        assert_eq!(received.load(Ordering::SeqCst), 0);
        assert!(session.is_connected());
    }

    #[test]
    fn test_messages_after_disconnect_are_ignored() {
        let (session, transport) = session("user1");
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        session.on_message(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.connect().unwrap();
        session.disconnect();
        (transport.last_callbacks().on_message)(message("1"));

        assert_eq!(received.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_open_leaves_session_disconnected() {
        let session = ClientSession::new(BASE_URL, "user1", FakeTransport::failing());

        let result = session.connect();

        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_reconnect_after_error_opens_a_new_handle() {
        let (session, transport) = session("user1");

        session.connect().unwrap();
        (transport.last_callbacks().on_error)(Error::Transport("dropped".to_string()));
        session.connect().unwrap();

        assert_eq!(transport.opened().len(), 2);
        assert!(session.is_connected());
    }
}
