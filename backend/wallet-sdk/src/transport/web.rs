//! Browser [`Host`] built on `web-sys`.

use crate::error::TransportError;
use crate::origin::Origin;
use crate::protocol::Envelope;
use crate::transport::{
    DismissListener, FrameHandle, FrameSpec, Host, InboundMessage, ListenerId, MessageListener,
    RemoteContext, WindowHandle, WindowSpec,
};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use log::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, HtmlIFrameElement, MessageEvent, MouseEvent, Window};

fn js_error(context: &str, error: JsValue) -> String {
    format!("{context}: {error:?}")
}

fn to_js(envelope: &Envelope) -> Result<JsValue, TransportError> {
    let json = serde_json::to_string(envelope)?;
    js_sys::JSON::parse(&json).map_err(|e| TransportError::post(js_error("JSON.parse", e)))
}

fn from_js(data: &JsValue) -> Option<serde_json::Value> {
    let json: String = js_sys::JSON::stringify(data).ok()?.into();
    serde_json::from_str(&json).ok()
}

fn post_to(target: &Window, envelope: &Envelope, origin: &Origin) -> Result<(), TransportError> {
    let message = to_js(envelope)?;
    target
        .post_message(&message, origin.as_str())
        .map_err(|e| TransportError::post(js_error("postMessage", e)))
}

/// The page's own `window`.
pub struct BrowserHost {
    window: Window,
    listeners: RefCell<HashMap<ListenerId, Closure<dyn FnMut(MessageEvent)>>>,
    next_listener: Cell<u64>,
}

impl BrowserHost {
    pub fn new() -> Result<Self, TransportError> {
        let window = web_sys::window()
            .ok_or_else(|| TransportError::mount("No global window object"))?;
        Ok(Self {
            window,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        })
    }

    fn create_element(&self, tag: &str) -> Result<Element, TransportError> {
        let document = self
            .window
            .document()
            .ok_or_else(|| TransportError::mount("No document"))?;
        document
            .create_element(tag)
            .map_err(|e| TransportError::mount(js_error("createElement", e)))
    }
}

impl Host for BrowserHost {
    fn page_hostname(&self) -> Option<String> {
        self.window.location().hostname().ok()
    }

    fn user_agent(&self) -> Option<String> {
        self.window.navigator().user_agent().ok()
    }

    fn is_secure_context(&self) -> bool {
        self.window.is_secure_context()
    }

    fn create_frame(
        &self,
        spec: &FrameSpec,
        on_dismiss: DismissListener,
    ) -> Result<Box<dyn FrameHandle>, TransportError> {
        let mount = |e: JsValue| TransportError::mount(js_error("setAttribute", e));

        let container: HtmlElement = self
            .create_element("div")?
            .dyn_into()
            .map_err(|_| TransportError::mount("Container is not an HtmlElement"))?;
        container
            .set_attribute("style", spec.container_css)
            .map_err(mount)?;

        let frame: HtmlIFrameElement = self
            .create_element("iframe")?
            .dyn_into()
            .map_err(|_| TransportError::mount("Frame is not an HtmlIFrameElement"))?;
        frame.set_src(spec.url.as_str());
        frame.set_attribute("title", spec.title).map_err(mount)?;
        frame
            .set_attribute("data-testid", spec.test_id)
            .map_err(mount)?;
        frame.set_attribute("allow", &spec.allow).map_err(mount)?;
        frame.set_attribute("sandbox", spec.sandbox).map_err(mount)?;
        frame.set_attribute("style", spec.frame_css).map_err(mount)?;

        container
            .append_child(&frame)
            .map_err(|e| TransportError::mount(js_error("appendChild", e)))?;

        let body = self
            .window
            .document()
            .and_then(|document| document.body())
            .ok_or_else(|| TransportError::mount("No document body"))?;
        body.append_child(&container)
            .map_err(|e| TransportError::mount(js_error("appendChild", e)))?;

        let backdrop = container.clone();
        let on_click = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            let on_backdrop = event
                .target()
                .is_some_and(|target| js_sys::Object::is(target.as_ref(), backdrop.as_ref()));
            if on_backdrop {
                on_dismiss();
            }
        });
        container
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(|e| TransportError::mount(js_error("addEventListener", e)))?;

        Ok(Box::new(BrowserFrame {
            container,
            frame,
            on_click,
        }))
    }

    fn open_window(&self, spec: &WindowSpec) -> Option<Box<dyn WindowHandle>> {
        match self
            .window
            .open_with_url_and_target_and_features(spec.url.as_str(), spec.name, spec.features)
        {
            Ok(Some(window)) => Some(Box::new(BrowserWindow { window })),
            Ok(None) => None,
            Err(e) => {
                warn!("{}", js_error("window.open", e));
                None
            }
        }
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get() + 1);
        self.next_listener.set(id.0);

        let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match from_js(&event.data()) {
                Some(data) => listener(InboundMessage {
                    origin: event.origin(),
                    data,
                }),
                None => debug!("Ignoring non-JSON message from {}", event.origin()),
            }
        });

        if let Err(e) = self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            warn!("{}", js_error("addEventListener(message)", e));
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        if let Some(closure) = self.listeners.borrow_mut().remove(&id) {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
        }
    }
}

struct BrowserFrame {
    container: HtmlElement,
    frame: HtmlIFrameElement,
    on_click: Closure<dyn FnMut(MouseEvent)>,
}

impl RemoteContext for BrowserFrame {
    fn post_message(&self, envelope: &Envelope, target_origin: &Origin) -> Result<(), TransportError> {
        let target = self
            .frame
            .content_window()
            .ok_or_else(|| TransportError::post("Frame has no content window"))?;
        post_to(&target, envelope, target_origin)
    }
}

impl FrameHandle for BrowserFrame {
    fn set_visible(&self, visible: bool) {
        let display = if visible { "block" } else { "none" };
        if let Err(e) = self.container.style().set_property("display", display) {
            warn!("{}", js_error("style.display", e));
        }
    }

    fn remove(&self) {
        let _ = self.container.remove_event_listener_with_callback(
            "click",
            self.on_click.as_ref().unchecked_ref(),
        );
        self.container.remove();
    }
}

struct BrowserWindow {
    window: Window,
}

impl RemoteContext for BrowserWindow {
    fn post_message(&self, envelope: &Envelope, target_origin: &Origin) -> Result<(), TransportError> {
        post_to(&self.window, envelope, target_origin)
    }
}

impl WindowHandle for BrowserWindow {
    fn is_closed(&self) -> bool {
        self.window.closed().unwrap_or(true)
    }

    fn focus(&self) {
        let _ = self.window.focus();
    }

    fn close(&self) {
        let _ = self.window.close();
    }
}
