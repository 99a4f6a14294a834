//! In-process [`Host`] used by tests and the demo app.
//!
//! Frames and windows are plain records; everything posted to them is kept in
//! a history and pushed to an async inbox. A [`RemoteEndpoint`] plays the
//! wallet document side and delivers messages back through the registered
//! listeners, the same way a browser `message` event would.
//!
//! Delivery happens only when the test (or simulator) calls into the host,
//! never from inside a post, which mirrors browser event-loop semantics.

use crate::error::TransportError;
use crate::origin::Origin;
use crate::protocol::{Envelope, RpcRequest, RpcResponse, Topic};
use crate::transport::{
    DismissListener, FrameHandle, FrameSpec, Host, InboundMessage, ListenerId, MessageListener,
    RemoteContext, WindowHandle, WindowSpec,
};

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};
use serde_json::Value;
use tokio::sync::{Mutex, Notify, mpsc};

const DEFAULT_PAGE_HOSTNAME: &str = "app.example.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Which remote context a message was posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    Frame(u64),
    Window(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub context: ContextId,
    pub target_origin: String,
    pub envelope: Envelope,
}

impl PostedMessage {
    /// The request carried by an `rpc-request` envelope.
    pub fn request(&self) -> Option<RpcRequest> {
        match self.envelope.topic() {
            Some(Topic::RpcRequest) => serde_json::from_value(self.envelope.payload.clone()).ok(),
            _ => None,
        }
    }
}

struct FrameRecord {
    spec: FrameSpec,
    visible: bool,
    removed: bool,
    on_dismiss: DismissListener,
}

struct WindowRecord {
    spec: WindowSpec,
    closed: bool,
    focus_count: usize,
}

struct HostState {
    page_hostname: Option<String>,
    user_agent: Option<String>,
    secure_context: bool,
    popups_blocked: bool,
    blocked_popups: usize,
    frames: Vec<FrameRecord>,
    windows: Vec<WindowRecord>,
    listeners: Vec<(ListenerId, MessageListener)>,
    next_listener: u64,
    posted: Vec<PostedMessage>,
    outbox: mpsc::UnboundedSender<PostedMessage>,
}

impl HostState {
    fn record(&mut self, message: PostedMessage) {
        trace!(
            "{:?} <- '{}' (target {})",
            message.context, message.envelope.topic, message.target_origin
        );
        self.posted.push(message.clone());
        let _ = self.outbox.send(message);
    }
}

#[derive(Clone)]
pub struct MemoryHost {
    state: Rc<RefCell<HostState>>,
    inbox: Rc<Mutex<mpsc::UnboundedReceiver<PostedMessage>>>,
    created: Rc<Notify>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            state: Rc::new(RefCell::new(HostState {
                page_hostname: Some(DEFAULT_PAGE_HOSTNAME.to_string()),
                user_agent: Some(DEFAULT_USER_AGENT.to_string()),
                secure_context: true,
                popups_blocked: false,
                blocked_popups: 0,
                frames: Vec::new(),
                windows: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
                posted: Vec::new(),
                outbox,
            })),
            inbox: Rc::new(Mutex::new(inbox)),
            created: Rc::new(Notify::new()),
        }
    }

    pub fn with_page_hostname(self, hostname: Option<&str>) -> Self {
        self.state.borrow_mut().page_hostname = hostname.map(str::to_string);
        self
    }

    pub fn with_user_agent(self, user_agent: Option<&str>) -> Self {
        self.state.borrow_mut().user_agent = user_agent.map(str::to_string);
        self
    }

    pub fn with_secure_context(self, secure: bool) -> Self {
        self.state.borrow_mut().secure_context = secure;
        self
    }

    pub fn with_popups_blocked(self, blocked: bool) -> Self {
        self.set_popups_blocked(blocked);
        self
    }

    pub fn set_popups_blocked(&self, blocked: bool) {
        self.state.borrow_mut().popups_blocked = blocked;
    }

    // --- observation ---

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.state.borrow().posted.clone()
    }

    pub fn posted_requests(&self) -> Vec<RpcRequest> {
        self.state
            .borrow()
            .posted
            .iter()
            .filter_map(PostedMessage::request)
            .collect()
    }

    pub fn frames_created(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn live_frames(&self) -> usize {
        self.state.borrow().frames.iter().filter(|f| !f.removed).count()
    }

    pub fn frame_visible(&self) -> bool {
        self.state
            .borrow()
            .frames
            .iter()
            .any(|f| !f.removed && f.visible)
    }

    pub fn frame_spec(&self) -> Option<FrameSpec> {
        self.state.borrow().frames.last().map(|f| f.spec.clone())
    }

    /// Frames plus popup windows created so far. Each is a fresh wallet document.
    pub fn documents_created(&self) -> usize {
        let state = self.state.borrow();
        state.frames.len() + state.windows.len()
    }

    pub fn windows_opened(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn blocked_popups(&self) -> usize {
        self.state.borrow().blocked_popups
    }

    pub fn window_open(&self) -> bool {
        self.state.borrow().windows.iter().any(|w| !w.closed)
    }

    pub fn window_spec(&self) -> Option<WindowSpec> {
        self.state.borrow().windows.last().map(|w| w.spec.clone())
    }

    pub fn window_focus_count(&self) -> usize {
        self.state
            .borrow()
            .windows
            .last()
            .map_or(0, |w| w.focus_count)
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Next message posted to any remote context, in posting order.
    pub async fn next_posted(&self) -> Option<PostedMessage> {
        self.inbox.lock().await.recv().await
    }

    /// Waits until more than `seen` documents exist and returns the new count.
    pub async fn next_document(&self, seen: usize) -> usize {
        loop {
            let count = self.documents_created();
            if count > seen {
                return count;
            }
            self.created.notified().await;
        }
    }

    /// Next posted `rpc-request`, skipping any other topic.
    pub async fn next_request(&self) -> Option<RpcRequest> {
        loop {
            let message = self.next_posted().await?;
            if let Some(request) = message.request() {
                return Some(request);
            }
        }
    }

    // --- user and remote simulation ---

    /// Clicks the overlay backdrop of the visible frame.
    pub fn click_backdrop(&self) -> bool {
        let on_dismiss = self
            .state
            .borrow()
            .frames
            .iter()
            .rev()
            .find(|f| !f.removed && f.visible)
            .map(|f| Rc::clone(&f.on_dismiss));

        match on_dismiss {
            Some(on_dismiss) => {
                debug!("Simulated backdrop click");
                on_dismiss();
                true
            }
            None => false,
        }
    }

    /// Closes the popup the way a user would. Browsers fire no event for
    /// this; the bridge only notices on its next send.
    pub fn close_window_by_user(&self) -> bool {
        let mut state = self.state.borrow_mut();
        match state.windows.iter_mut().rev().find(|w| !w.closed) {
            Some(window) => {
                window.closed = true;
                debug!("Simulated user closing popup");
                true
            }
            None => false,
        }
    }

    /// Delivers a message to every registered listener.
    pub fn deliver(&self, message: InboundMessage) {
        let listeners: Vec<MessageListener> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(message.clone());
        }
    }

    /// The wallet document side, reporting `origin` on every message.
    pub fn remote(&self, origin: impl Into<String>) -> RemoteEndpoint {
        RemoteEndpoint {
            host: self.clone(),
            origin: origin.into(),
        }
    }
}

impl Host for MemoryHost {
    fn page_hostname(&self) -> Option<String> {
        self.state.borrow().page_hostname.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.state.borrow().user_agent.clone()
    }

    fn is_secure_context(&self) -> bool {
        self.state.borrow().secure_context
    }

    fn create_frame(
        &self,
        spec: &FrameSpec,
        on_dismiss: DismissListener,
    ) -> Result<Box<dyn FrameHandle>, TransportError> {
        let mut state = self.state.borrow_mut();
        let index = state.frames.len();
        state.frames.push(FrameRecord {
            spec: spec.clone(),
            visible: false,
            removed: false,
            on_dismiss,
        });
        self.created.notify_one();
        Ok(Box::new(MemoryFrame {
            index,
            state: Rc::clone(&self.state),
        }))
    }

    fn open_window(&self, spec: &WindowSpec) -> Option<Box<dyn WindowHandle>> {
        let mut state = self.state.borrow_mut();
        if state.popups_blocked {
            state.blocked_popups += 1;
            return None;
        }

        let index = state.windows.len();
        state.windows.push(WindowRecord {
            spec: spec.clone(),
            closed: false,
            focus_count: 0,
        });
        self.created.notify_one();
        Some(Box::new(MemoryWindow {
            index,
            state: Rc::clone(&self.state),
        }))
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push((id, listener));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.state
            .borrow_mut()
            .listeners
            .retain(|(existing, _)| *existing != id);
    }
}

struct MemoryFrame {
    index: usize,
    state: Rc<RefCell<HostState>>,
}

impl RemoteContext for MemoryFrame {
    fn post_message(&self, envelope: &Envelope, target_origin: &Origin) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.frames[self.index].removed {
            return Err(TransportError::post("Frame has been removed"));
        }
        state.record(PostedMessage {
            context: ContextId::Frame(self.index as u64),
            target_origin: target_origin.to_string(),
            envelope: envelope.clone(),
        });
        Ok(())
    }
}

impl FrameHandle for MemoryFrame {
    fn set_visible(&self, visible: bool) {
        self.state.borrow_mut().frames[self.index].visible = visible;
    }

    fn remove(&self) {
        let mut state = self.state.borrow_mut();
        let frame = &mut state.frames[self.index];
        frame.removed = true;
        frame.visible = false;
    }
}

struct MemoryWindow {
    index: usize,
    state: Rc<RefCell<HostState>>,
}

impl RemoteContext for MemoryWindow {
    fn post_message(&self, envelope: &Envelope, target_origin: &Origin) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.windows[self.index].closed {
            return Err(TransportError::post("Window has been closed"));
        }
        state.record(PostedMessage {
            context: ContextId::Window(self.index as u64),
            target_origin: target_origin.to_string(),
            envelope: envelope.clone(),
        });
        Ok(())
    }
}

impl WindowHandle for MemoryWindow {
    fn is_closed(&self) -> bool {
        self.state.borrow().windows[self.index].closed
    }

    fn focus(&self) {
        self.state.borrow_mut().windows[self.index].focus_count += 1;
    }

    fn close(&self) {
        self.state.borrow_mut().windows[self.index].closed = true;
    }
}

/// The wallet document's side of the channel.
#[derive(Clone)]
pub struct RemoteEndpoint {
    host: MemoryHost,
    origin: String,
}

impl RemoteEndpoint {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn send_raw(&self, data: Value) {
        self.host.deliver(InboundMessage {
            origin: self.origin.clone(),
            data,
        });
    }

    pub fn send(&self, envelope: &Envelope) {
        match serde_json::to_value(envelope) {
            Ok(data) => self.send_raw(data),
            Err(e) => debug!("Failed to encode simulated envelope: {e}"),
        }
    }

    pub fn signal_ready(&self) {
        self.send(&Envelope::ready());
    }

    pub fn request_close(&self) {
        self.send(&Envelope::new(Topic::Close, Value::Null));
    }

    pub fn respond(&self, response: &RpcResponse) {
        match Envelope::response(response) {
            Ok(envelope) => self.send(&envelope),
            Err(e) => debug!("Failed to encode simulated response: {e}"),
        }
    }

    pub fn respond_ok(&self, request: &RpcRequest, result: Value) {
        self.respond(&RpcResponse::success(request, result));
    }

    pub fn respond_err(&self, request: &RpcRequest, code: i64, message: &str) {
        self.respond(&RpcResponse::failure(request, code, message));
    }
}
