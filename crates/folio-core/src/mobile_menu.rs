#![forbid(unsafe_code)]

//! Mobile hamburger menu.
//!
//! On viewports at or below the breakpoint a toggle button is inserted in the
//! navigation bar, right before the link list. The menu is a two-state
//! machine:
//!
//! ```text
//!            toggle
//!   Closed ─────────▶ Open
//!     ▲                 │ toggle
//!     └─────────────────┤ link click
//!                       │ click outside the bar
//! ```
//!
//! Every transition writes the button's `aria-expanded` and the list's open
//! class from the same state value, so the two always agree.
//!
//! Installation is idempotent: it does nothing when the button already
//! exists (ours or one shipped in the markup), and it is re-attempted after
//! every debounced resize so a page that grows narrow still gets the button.
//! [`MobileMenu::teardown`] takes the button back out, so a later install on
//! the same page starts from clean markup.

use crate::config::MenuConfig;
use crate::dom::{
    ElementMut, ElementQuery, EventTarget, EventType, Events, ListenerId, NodeId, Outcome, Route,
    Viewport, ensure_stylesheet,
};

const BUTTON_MARKUP: &str = "<span></span><span></span><span></span>";

/// Open/closed state of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    Open,
}

impl MenuState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }

    /// Value of `aria-expanded` for this state.
    #[must_use]
    pub const fn aria_expanded(self) -> &'static str {
        match self {
            Self::Closed => "false",
            Self::Open => "true",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Wiring {
    bar: NodeId,
    list: NodeId,
    button: NodeId,
    state: MenuState,
}

/// Stylesheet for the toggle button and the collapsible list.
#[must_use]
pub fn menu_css(config: &MenuConfig) -> String {
    let button = &config.button_class;
    let list = &config.nav_list_selector;
    let bar = &config.nav_bar_selector;
    let open = &config.open_class;
    let breakpoint = config.breakpoint;
    format!(
        r#".{button} {{
    display: none;
    flex-direction: column;
    gap: 5px;
    background: transparent;
    border: none;
    cursor: pointer;
    padding: 8px;
    z-index: 101;
}}

.{button} span {{
    width: 25px;
    height: 3px;
    background: var(--text-color);
    border-radius: 2px;
    transition: all 0.3s ease;
}}

@media screen and (max-width: {breakpoint}px) {{
    .{button} {{
        display: flex;
    }}

    {list} {{
        position: absolute;
        top: 100%;
        left: 0;
        right: 0;
        background: rgba(247, 241, 232, 0.98);
        backdrop-filter: blur(12px);
        flex-direction: column;
        padding: 1rem;
        box-shadow: 0 4px 20px rgba(0, 0, 0, 0.1);
        transform: translateY(-100%);
        opacity: 0;
        visibility: hidden;
        transition: all 0.3s ease;
    }}

    {list}.{open} {{
        transform: translateY(0);
        opacity: 1;
        visibility: visible;
    }}

    {bar} {{
        position: relative;
    }}
}}
"#
    )
}

/// Mobile menu controller for one navigation bar.
#[derive(Debug, Clone, Default)]
pub struct MobileMenu {
    wiring: Option<Wiring>,
    listeners: Vec<ListenerId>,
}

impl MobileMenu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and wire the toggle button if the viewport is narrow enough and
    /// no button exists yet. Returns whether a button was built.
    pub fn install<D>(&mut self, doc: &mut D, config: &MenuConfig) -> bool
    where
        D: ElementQuery + ElementMut + Viewport + Events + ?Sized,
    {
        if self.wiring.is_some() {
            return false;
        }
        let (Some(list), Some(bar)) = (
            doc.query(&config.nav_list_selector),
            doc.query(&config.nav_bar_selector),
        ) else {
            return false;
        };
        if doc.query(&format!(".{}", config.button_class)).is_some() {
            return false;
        }
        let width = doc.inner_width();
        if width > config.breakpoint {
            crate::trace!(width, "viewport too wide for mobile menu");
            return false;
        }

        let button = doc.create_element("button");
        doc.set_attribute(button, "class", &config.button_class);
        doc.set_attribute(button, "aria-label", &config.button_label);
        doc.set_attribute(button, "aria-expanded", MenuState::Closed.aria_expanded());
        doc.set_inner_html(button, BUTTON_MARKUP);
        ensure_stylesheet(doc, &config.style_id, &menu_css(config));
        doc.insert_before(bar, button, Some(list));

        self.listeners
            .push(doc.listen(EventTarget::Node(button), EventType::Click, Route::MenuToggle));
        let links = doc.query_within(list, "a");
        for &link in &links {
            self.listeners
                .push(doc.listen(EventTarget::Node(link), EventType::Click, Route::MenuLink));
        }
        self.listeners
            .push(doc.listen(EventTarget::Document, EventType::Click, Route::MenuOutside));

        self.wiring = Some(Wiring {
            bar,
            list,
            button,
            state: MenuState::Closed,
        });
        crate::debug!(width, links = links.len(), "mobile menu installed");
        true
    }

    /// Toggle button activation.
    pub fn toggle<D>(&mut self, doc: &mut D, config: &MenuConfig) -> Outcome
    where
        D: ElementMut + ?Sized,
    {
        match self.wiring.map(|w| w.state) {
            Some(state) => self.transition(doc, config, state.toggled()),
            None => Outcome::Ignored,
        }
    }

    /// A link inside the menu was activated.
    pub fn on_link<D>(&mut self, doc: &mut D, config: &MenuConfig) -> Outcome
    where
        D: ElementMut + ?Sized,
    {
        self.transition(doc, config, MenuState::Closed)
    }

    /// A click reached the document. Closes an open menu when `target` lies
    /// outside the navigation bar; unknown targets count as outside.
    pub fn on_document_click<D>(
        &mut self,
        doc: &mut D,
        config: &MenuConfig,
        target: Option<NodeId>,
    ) -> Outcome
    where
        D: ElementQuery + ElementMut + ?Sized,
    {
        let Some(wiring) = self.wiring else {
            return Outcome::Ignored;
        };
        if !wiring.state.is_open() {
            return Outcome::Ignored;
        }
        if target.is_some_and(|t| doc.contains(wiring.bar, t)) {
            return Outcome::Ignored;
        }
        self.transition(doc, config, MenuState::Closed)
    }

    /// Close the menu, drop its subscriptions and remove the button. The
    /// stylesheet stays in the head for the next install to reuse.
    pub fn teardown<D>(&mut self, doc: &mut D, config: &MenuConfig)
    where
        D: ElementMut + Events + ?Sized,
    {
        for listener in self.listeners.drain(..) {
            doc.unlisten(listener);
        }
        let Some(wiring) = self.wiring.take() else {
            return;
        };
        doc.remove_class(wiring.list, &config.open_class);
        doc.remove(wiring.button);
        crate::debug!("mobile menu removed");
    }

    fn transition<D>(&mut self, doc: &mut D, config: &MenuConfig, next: MenuState) -> Outcome
    where
        D: ElementMut + ?Sized,
    {
        let Some(wiring) = self.wiring.as_mut() else {
            return Outcome::Ignored;
        };
        wiring.state = next;
        doc.set_attribute(wiring.button, "aria-expanded", next.aria_expanded());
        if next.is_open() {
            doc.add_class(wiring.list, &config.open_class);
            doc.add_class(wiring.button, &config.open_class);
        } else {
            doc.remove_class(wiring.list, &config.open_class);
            doc.remove_class(wiring.button, &config.open_class);
        }
        crate::trace!(state = ?next, "mobile menu");
        Outcome::Handled
    }

    /// Current state, `None` until a button has been built.
    #[must_use]
    pub fn state(&self) -> Option<MenuState> {
        self.wiring.map(|w| w.state)
    }

    #[must_use]
    pub fn button(&self) -> Option<NodeId> {
        self.wiring.map(|w| w.button)
    }

    #[must_use]
    pub fn list(&self) -> Option<NodeId> {
        self.wiring.map(|w| w.list)
    }
}
