//! Component and Elementable - the descriptions the engine accepts.
//!
//! Shape is resolved once through the closed [`Elementable`] enum; nothing
//! downstream probes for a render function.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::scope::Scope;
use super::types::Template;
use crate::types::Key;

/// Render function of a component.
pub type Producer = Rc<dyn Fn(&Scope) -> Template>;

/// Type-erased state initializer.
pub(crate) type StateInit = Rc<dyn Fn() -> Box<dyn Any>>;

// =============================================================================
// Component
// =============================================================================

/// Stateful description producing a [`Template`].
///
/// # Example
///
/// ```
/// use spark_dom::{Component, Template};
///
/// #[derive(Clone, Default)]
/// struct Counter { count: u32 }
///
/// let counter = Component::new(|cx| {
///     let count = cx.with_state(|s: &Counter| s.count).unwrap_or_default();
///     let set_count = cx.setter(|s: &mut Counter, v: u32| s.count = v);
///     Template::new("button")
///         .on("click", move |_, _| { set_count.set(count + 1); })
///         .child(count)
/// })
/// .with_state(Counter::default)
/// .key("counter");
/// # let _ = counter;
/// ```
#[derive(Clone)]
pub struct Component {
    pub(crate) render: Producer,
    pub(crate) state: Option<StateInit>,
    pub key: Option<Key>,
    pub binding: Option<String>,
}

impl Component {
    pub fn new(render: impl Fn(&Scope) -> Template + 'static) -> Self {
        Self {
            render: Rc::new(render),
            state: None,
            key: None,
            binding: None,
        }
    }

    /// State initializer, invoked exactly once when the instance is created.
    pub fn with_state<S: 'static>(mut self, init: impl Fn() -> S + 'static) -> Self {
        self.state = Some(Rc::new(move || Box::new(init()) as Box<dyn Any>));
        self
    }

    /// Static initial state, cloned once when the instance is created.
    pub fn with_initial_state<S: Clone + 'static>(mut self, value: S) -> Self {
        self.state = Some(Rc::new(move || Box::new(value.clone()) as Box<dyn Any>));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn binding(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    pub fn producer(&self) -> &Producer {
        &self.render
    }

    /// Evaluate the initializer. Components without one start with `()`.
    pub(crate) fn initial_state(&self) -> Box<dyn Any> {
        match &self.state {
            Some(init) => init(),
            None => Box::new(()),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("key", &self.key)
            .field("binding", &self.binding)
            .field("stateful", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Elementable
// =============================================================================

/// Anything that can become a live node.
#[derive(Debug, Clone)]
pub enum Elementable {
    Template(Template),
    Component(Component),
    /// Primitive value, rendered as a text node.
    Text(String),
}

impl Elementable {
    pub fn is_text(&self) -> bool {
        matches!(self, Elementable::Text(_))
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Elementable::Template(t) => t.key.as_ref(),
            Elementable::Component(c) => c.key.as_ref(),
            Elementable::Text(_) => None,
        }
    }

    pub fn binding(&self) -> Option<&str> {
        match self {
            Elementable::Template(t) => t.binding.as_deref(),
            Elementable::Component(c) => c.binding.as_deref(),
            Elementable::Text(_) => None,
        }
    }
}

impl From<Template> for Elementable {
    fn from(value: Template) -> Self {
        Elementable::Template(value)
    }
}

impl From<Component> for Elementable {
    fn from(value: Component) -> Self {
        Elementable::Component(value)
    }
}

impl From<&str> for Elementable {
    fn from(value: &str) -> Self {
        Elementable::Text(value.to_string())
    }
}

impl From<String> for Elementable {
    fn from(value: String) -> Self {
        Elementable::Text(value)
    }
}

impl From<&String> for Elementable {
    fn from(value: &String) -> Self {
        Elementable::Text(value.clone())
    }
}

macro_rules! elementable_from_display {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Elementable {
                fn from(value: $t) -> Self {
                    Elementable::Text(value.to_string())
                }
            }
        )*
    };
}

elementable_from_display!(
    char, bool, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64
);
