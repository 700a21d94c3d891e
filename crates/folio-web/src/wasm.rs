#![forbid(unsafe_code)]

//! Browser host: [`WebDocument`] implements the core capability traits over
//! `web-sys`, and every browser callback is funneled back into the shared
//! [`Runtime`].
//!
//! Elements handed to the core are interned into a [`NodeRegistry`] and
//! addressed by slot; a `WeakMap` finds the slot of an element already seen.
//! Removing an element releases its slot and those of any registered
//! elements inside it. Callbacks hold only a weak reference to the runtime,
//! so dropping the runtime tears everything down. A callback that finds the
//! runtime already borrowed (a re-entrant dispatch) is dropped with a trace
//! line.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use folio_core::dom::{
    Clock, DomEvent, ElementMut, ElementQuery, EventTarget, EventType, Events, FrameTask,
    ListenerId, NodeId, Observation, Observer, ObserverOptions, Outcome, Route, ScrollBehavior,
    Scheduler, TimerId, TimerTask, Viewport,
};
use folio_core::{Error, Site, SiteConfig};
use gloo::events::{EventListener, EventListenerOptions};
use gloo::render::{AnimationFrame, request_animation_frame};
use gloo::timers::callback::Timeout;
use js_sys::{Array, Reflect, WeakMap};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Element, HtmlElement, HtmlImageElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, KeyboardEvent, Node, ScrollToOptions, Window,
};

use crate::registry::NodeRegistry;
use crate::{console_log, options};

/// Handle minted for elements the browser refused to create. Never resolves,
/// so every operation on it is a no-op.
const VOID: NodeId = NodeId::new(u32::MAX);

const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

type IntersectionCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

thread_local! {
    static RUNTIME: RefCell<Option<Rc<RefCell<Runtime>>>> = const { RefCell::new(None) };
}

struct Runtime {
    site: Site,
    doc: WebDocument,
}

fn warn_dom(operation: &str, err: &JsValue) {
    let err = Error::Dom(format!("{operation}: {err:?}"));
    tracing::warn!(%err, "dom call failed");
}

/// `web-sys` implementation of the core document traits.
struct WebDocument {
    window: Window,
    document: web_sys::Document,
    runtime: Weak<RefCell<Runtime>>,
    nodes: RefCell<NodeRegistry<Element>>,
    ids: WeakMap,
    next_listener: u32,
    listeners: BTreeMap<ListenerId, EventListener>,
    next_timer: u32,
    timers: BTreeMap<TimerId, Timeout>,
    next_frame: u32,
    frames: BTreeMap<u32, AnimationFrame>,
    observers: BTreeMap<Observer, (IntersectionObserver, IntersectionCallback)>,
}

impl WebDocument {
    fn new(window: Window, document: web_sys::Document, runtime: Weak<RefCell<Runtime>>) -> Self {
        Self {
            window,
            document,
            runtime,
            nodes: RefCell::new(NodeRegistry::new()),
            ids: WeakMap::new(),
            next_listener: 0,
            listeners: BTreeMap::new(),
            next_timer: 0,
            timers: BTreeMap::new(),
            next_frame: 0,
            frames: BTreeMap::new(),
            observers: BTreeMap::new(),
        }
    }

    /// Registry handle for `element`, reusing an existing one.
    fn intern(&self, element: Element) -> NodeId {
        if let Some(index) = self.ids.get(&element).as_f64() {
            let node = NodeId::new(index as u32);
            let value: &JsValue = element.as_ref();
            let known = self.nodes.borrow().get(node).is_some_and(|known| {
                let known: &JsValue = known.as_ref();
                known == value
            });
            if known {
                return node;
            }
        }
        let node = self.nodes.borrow_mut().insert(element.clone());
        self.ids.set(&element, &JsValue::from(node.get()));
        node
    }

    fn element(&self, node: NodeId) -> Option<Element> {
        self.nodes.borrow().get(node).cloned()
    }

    /// Release `root` and every registered element inside it.
    fn release_subtree(&self, root: &Element) {
        let mut nodes = self.nodes.borrow_mut();
        let inside: Vec<NodeId> = nodes
            .iter()
            .filter(|(_, known)| {
                let known: &Node = known.as_ref();
                root.contains(Some(known))
            })
            .map(|(node, _)| node)
            .collect();
        for node in inside {
            if let Some(element) = nodes.release(node) {
                self.ids.delete(&element);
            }
        }
        tracing::trace!(live = nodes.live(), "released detached elements");
    }

    fn html(&self, node: NodeId) -> Option<HtmlElement> {
        self.element(node)?.dyn_into::<HtmlElement>().ok()
    }

    fn collect(&self, list: Result<web_sys::NodeList, JsValue>, selector: &str) -> Vec<NodeId> {
        let list = match list {
            Ok(list) => list,
            Err(err) => {
                warn_dom(&format!("querySelectorAll({selector})"), &err);
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|el| self.intern(el))
            .collect()
    }

    fn event_target(&self, target: EventTarget) -> Option<web_sys::EventTarget> {
        match target {
            EventTarget::Window => Some(self.window.clone().into()),
            EventTarget::Document => Some(self.document.clone().into()),
            EventTarget::Node(node) => self.element(node).map(Into::into),
        }
    }

    /// The browser observer for `observer`, created on first use.
    fn observer(
        &mut self,
        observer: Observer,
        options: &ObserverOptions,
    ) -> Option<IntersectionObserver> {
        if let Some((existing, _)) = self.observers.get(&observer) {
            return Some(existing.clone());
        }
        let runtime = self.runtime.clone();
        let callback: IntersectionCallback =
            Closure::new(move |entries: Array, _: IntersectionObserver| {
                deliver_intersections(&runtime, observer, &entries);
            });
        let init = IntersectionObserverInit::new();
        init.set_root_margin(&options.root_margin);
        init.set_threshold(&JsValue::from_f64(options.threshold));
        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init) {
            Ok(created) => {
                self.observers.insert(observer, (created.clone(), callback));
                Some(created)
            }
            Err(err) => {
                warn_dom("new IntersectionObserver", &err);
                None
            }
        }
    }
}

impl ElementQuery for WebDocument {
    fn query(&self, selector: &str) -> Option<NodeId> {
        match self.document.query_selector(selector) {
            Ok(found) => found.map(|el| self.intern(el)),
            Err(err) => {
                warn_dom(&format!("querySelector({selector})"), &err);
                None
            }
        }
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.collect(self.document.query_selector_all(selector), selector)
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(scope) = self.element(scope) else {
            return Vec::new();
        };
        self.collect(scope.query_selector_all(selector), selector)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.document
            .get_element_by_id(id)
            .map(|el| self.intern(el))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        match (self.element(ancestor), self.element(node)) {
            (Some(ancestor), Some(node)) => {
                let node: &Node = node.as_ref();
                ancestor.contains(Some(node))
            }
            _ => false,
        }
    }

    fn image_source(&self, node: NodeId) -> Option<String> {
        let el = self.element(node)?;
        match el.dyn_ref::<HtmlImageElement>() {
            Some(img) => Some(img.src()),
            None => el.get_attribute("src"),
        }
    }
}

impl ElementMut for WebDocument {
    fn create_element(&mut self, tag: &str) -> NodeId {
        match self.document.create_element(tag) {
            Ok(el) => self.intern(el),
            Err(err) => {
                warn_dom(&format!("createElement({tag})"), &err);
                VOID
            }
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element(node)
            && let Err(err) = el.set_attribute(name, value)
        {
            warn_dom(&format!("setAttribute({name})"), &err);
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element(node)
            && let Err(err) = el.remove_attribute(name)
        {
            warn_dom(&format!("removeAttribute({name})"), &err);
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element(node)
            && let Err(err) = el.class_list().add_1(class)
        {
            warn_dom("classList.add", &err);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element(node)
            && let Err(err) = el.class_list().remove_1(class)
        {
            warn_dom("classList.remove", &err);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(el) = self.element(node) {
            el.set_text_content(Some(text));
        }
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) {
        if let Some(el) = self.element(node) {
            el.set_inner_html(html);
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(el) = self.html(node)
            && let Err(err) = el.style().set_property(property, value)
        {
            warn_dom(&format!("style.{property}"), &err);
        }
    }

    fn set_css_text(&mut self, node: NodeId, css: &str) {
        if let Some(el) = self.html(node) {
            el.style().set_css_text(css);
        }
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) else {
            return;
        };
        let reference = reference.and_then(|r| self.element(r));
        let reference: Option<&Node> = reference.as_ref().map(|el| el.unchecked_ref());
        if let Err(err) = parent.insert_before(&child, reference) {
            warn_dom("insertBefore", &err);
        }
    }

    fn append_to_head(&mut self, node: NodeId) {
        if let (Some(head), Some(el)) = (self.document.head(), self.element(node))
            && let Err(err) = head.append_child(&el)
        {
            warn_dom("head.appendChild", &err);
        }
    }

    fn append_to_body(&mut self, node: NodeId) {
        if let (Some(body), Some(el)) = (self.document.body(), self.element(node))
            && let Err(err) = body.append_child(&el)
        {
            warn_dom("body.appendChild", &err);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(el) = self.element(node) {
            el.remove();
            self.release_subtree(&el);
        }
    }
}

impl Viewport for WebDocument {
    fn location_path(&self) -> String {
        self.window.location().pathname().unwrap_or_default()
    }

    fn inner_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn bounding_top(&self, node: NodeId) -> f64 {
        self.element(node)
            .map_or(0.0, |el| el.get_bounding_client_rect().top())
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(match behavior {
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
            ScrollBehavior::Instant => web_sys::ScrollBehavior::Instant,
        });
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn prefers_reduced_motion(&self) -> bool {
        match self.window.match_media(REDUCED_MOTION_QUERY) {
            Ok(Some(list)) => list.matches(),
            _ => false,
        }
    }
}

impl Observation for WebDocument {
    fn observation_supported(&self) -> bool {
        Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
    }

    fn observe(&mut self, observer: Observer, options: &ObserverOptions, node: NodeId) {
        let Some(el) = self.element(node) else {
            return;
        };
        if let Some(browser) = self.observer(observer, options) {
            browser.observe(&el);
        }
    }

    fn disconnect(&mut self, observer: Observer) {
        if let Some((browser, _callback)) = self.observers.remove(&observer) {
            browser.disconnect();
        }
    }

    fn unobserve(&mut self, observer: Observer, node: NodeId) {
        if let (Some((browser, _)), Some(el)) = (self.observers.get(&observer), self.element(node))
        {
            browser.unobserve(&el);
        }
    }
}

impl Events for WebDocument {
    fn listen(&mut self, target: EventTarget, event: EventType, route: Route) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        let Some(browser_target) = self.event_target(target) else {
            return id;
        };
        let current = match target {
            EventTarget::Node(node) => Some(node),
            EventTarget::Window | EventTarget::Document => None,
        };
        let runtime = self.runtime.clone();
        let listener = EventListener::new_with_options(
            &browser_target,
            event.as_str(),
            EventListenerOptions::enable_prevent_default(),
            move |event: &web_sys::Event| deliver_event(&runtime, route, current, event),
        );
        self.listeners.insert(id, listener);
        id
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn unlisten_all(&mut self) {
        self.listeners.clear();
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Scheduler for WebDocument {
    fn set_timeout(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer = self.next_timer.wrapping_add(1);
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let runtime = self.runtime.clone();
        let timeout = Timeout::new(millis, move || deliver_timer(&runtime, id, task));
        self.timers.insert(id, timeout);
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        // Dropping a gloo `Timeout` cancels it.
        self.timers.remove(&id);
    }

    fn request_frame(&mut self, task: FrameTask) {
        let key = self.next_frame;
        self.next_frame = self.next_frame.wrapping_add(1);
        let runtime = self.runtime.clone();
        let frame = request_animation_frame(move |_| deliver_frame(&runtime, key, task));
        self.frames.insert(key, frame);
    }

    fn cancel_all(&mut self) {
        // Dropping gloo handles cancels them.
        self.timers.clear();
        self.frames.clear();
    }
}

impl Clock for WebDocument {
    fn current_year(&self) -> i32 {
        i32::try_from(js_sys::Date::new_0().get_full_year()).unwrap_or(i32::MAX)
    }
}

/// Run `f` against the runtime unless it is gone or busy.
fn with_runtime<R>(runtime: &Weak<RefCell<Runtime>>, f: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
    let runtime = runtime.upgrade()?;
    let Ok(mut guard) = runtime.try_borrow_mut() else {
        tracing::trace!("runtime busy; dropping re-entrant callback");
        return None;
    };
    Some(f(&mut guard))
}

fn deliver_event(
    runtime: &Weak<RefCell<Runtime>>,
    route: Route,
    current: Option<NodeId>,
    event: &web_sys::Event,
) {
    let outcome = with_runtime(runtime, |rt| {
        // Only the outside-click check reads the target.
        let target = match route {
            Route::MenuOutside => event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .map(|el| rt.doc.intern(el)),
            _ => None,
        };
        let key = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
        let dom_event = DomEvent {
            route,
            current,
            target,
            key,
        };
        rt.site.handle_event(&mut rt.doc, &dom_event)
    });
    if outcome == Some(Outcome::PreventDefault) {
        event.prevent_default();
    }
}

fn deliver_timer(runtime: &Weak<RefCell<Runtime>>, id: TimerId, task: TimerTask) {
    with_runtime(runtime, |rt| {
        rt.doc.timers.remove(&id);
        rt.site.handle_timer(&mut rt.doc, id, task);
    });
}

fn deliver_frame(runtime: &Weak<RefCell<Runtime>>, key: u32, task: FrameTask) {
    with_runtime(runtime, |rt| {
        rt.doc.frames.remove(&key);
        rt.site.handle_frame(&mut rt.doc, task);
    });
}

fn deliver_intersections(runtime: &Weak<RefCell<Runtime>>, observer: Observer, entries: &Array) {
    with_runtime(runtime, |rt| {
        for entry in entries.iter() {
            let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                continue;
            };
            if !entry.is_intersecting() {
                continue;
            }
            let node = rt.doc.intern(entry.target());
            rt.site.handle_intersection(&mut rt.doc, observer, node);
        }
    });
}

fn boot(config: SiteConfig) -> Result<(), JsValue> {
    if RUNTIME.with(|slot| slot.borrow().is_some()) {
        return Ok(());
    }
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let runtime = Rc::new_cyclic(|weak: &Weak<RefCell<Runtime>>| {
        RefCell::new(Runtime {
            site: Site::new(config),
            doc: WebDocument::new(window, document, weak.clone()),
        })
    });
    {
        let mut guard = runtime.borrow_mut();
        let Runtime { site, doc } = &mut *guard;
        if let Some(startup) = site.start(doc) {
            tracing::debug!(?startup, "site started");
        }
    }
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
    Ok(())
}

/// Wire up the page.
///
/// `options` is an optional JSON document overriding [`SiteConfig`] fields;
/// invalid options are logged and replaced by the defaults. Starts
/// immediately when the DOM is ready, otherwise on `DOMContentLoaded`.
/// Calling it again is a no-op.
#[wasm_bindgen(js_name = startSite)]
pub fn start_site(options: Option<String>) -> Result<(), JsValue> {
    if RUNTIME.with(|slot| slot.borrow().is_some()) {
        tracing::debug!("site already running");
        return Ok(());
    }
    let (config, error) = options::resolve(options.as_deref());
    console_log::init(&config.log_filter);
    if let Some(err) = error {
        tracing::warn!(%err, "ignoring site options");
    }

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| {
            if let Err(err) = boot(config) {
                warn_dom("start", &err);
            }
        })
        .forget();
        Ok(())
    } else {
        boot(config)
    }
}

/// Undo what the site changed on the page and release every listener,
/// timer and observer. `startSite` may be called again afterwards.
#[wasm_bindgen(js_name = stopSite)]
pub fn stop_site() {
    let runtime = RUNTIME.with(|slot| slot.borrow_mut().take());
    let Some(runtime) = runtime else {
        return;
    };
    let Ok(mut guard) = runtime.try_borrow_mut() else {
        tracing::warn!("stopSite called from inside a site callback; ignoring");
        RUNTIME.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&runtime)));
        return;
    };
    let Runtime { site, doc } = &mut *guard;
    site.stop(doc);
}
