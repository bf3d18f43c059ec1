//! Execution contexts and the targets that own them.

use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc};

use inspector_protocol::{ExecutionContextId, runtime::ExecutionContextDescription};
use serde_json::Value;
use url::Url;

/// Kind of a debugging target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetKind {
    /// A page or iframe.
    #[default]
    Frame,
    /// A service worker.
    ServiceWorker,
    /// A dedicated worker.
    Worker,
    /// A shared worker.
    SharedWorker,
    /// A Node.js process.
    Node,
    /// Anything else.
    Other,
}

/// A debugging target and its position in the target tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetInfo {
    /// Target id.
    pub id: String,
    /// Target kind.
    pub kind: TargetKind,
    /// Parent target; `None` for the root.
    pub parent: Option<Rc<TargetInfo>>,
}

impl TargetInfo {
    /// Creates a root target.
    #[must_use]
    pub fn root(id: impl Into<String>, kind: TargetKind) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            kind,
            parent: None,
        })
    }

    /// Creates a child of `parent`.
    #[must_use]
    pub fn child(id: impl Into<String>, kind: TargetKind, parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            kind,
            parent: Some(Rc::clone(parent)),
        })
    }

    fn weight(&self) -> u8 {
        if self.parent.is_none() {
            return 5;
        }
        match self.kind {
            TargetKind::Frame => 4,
            TargetKind::ServiceWorker => 3,
            TargetKind::Worker | TargetKind::SharedWorker => 2,
            TargetKind::Node | TargetKind::Other => 1,
        }
    }

    /// The chain from the root down to `target`.
    fn path(target: &Rc<Self>) -> Vec<Rc<Self>> {
        let mut path = vec![Rc::clone(target)];
        let mut current = target.parent.clone();
        while let Some(parent) = current {
            current = parent.parent.clone();
            path.push(parent);
        }
        path.reverse();
        path
    }
}

/// Orders execution contexts for display.
pub type ExecutionContextComparator = Rc<dyn Fn(&ExecutionContext, &ExecutionContext) -> Ordering>;

/// An isolated global scope inside a target.
pub struct ExecutionContext {
    /// Context id.
    pub id: ExecutionContextId,
    /// Globally unique id, preferred over `id` when evaluating.
    pub unique_id: Option<String>,
    /// Human-readable name; empty for main worlds.
    pub name: String,
    /// Security origin.
    pub origin: String,
    /// Main world of its frame.
    pub is_default: bool,
    /// Owning frame, if any.
    pub frame_id: Option<String>,
    /// Owning target.
    pub target: Rc<TargetInfo>,
    label: RefCell<String>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("is_default", &self.is_default)
            .field("target", &self.target.id)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub(crate) fn new(description: ExecutionContextDescription, target: Rc<TargetInfo>) -> Self {
        let aux_data = description
            .aux_data
            .unwrap_or_else(|| serde_json::json!({ "isDefault": true }));
        let is_default = aux_data
            .get("isDefault")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let frame_id = aux_data
            .get("frameId")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let label = default_label(&description.name, &description.origin);
        Self {
            id: description.id,
            unique_id: description.unique_id,
            name: description.name,
            origin: description.origin,
            is_default,
            frame_id,
            target,
            label: RefCell::new(label),
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> String {
        self.label.borrow().clone()
    }

    pub(crate) fn set_label(&self, label: &str) {
        *self.label.borrow_mut() = if label.is_empty() {
            default_label(&self.name, &self.origin)
        } else {
            label.to_owned()
        };
    }

    /// Default display order: target topology, then main worlds, then name.
    #[must_use]
    pub fn compare(a: &Self, b: &Self) -> Ordering {
        let path_a = TargetInfo::path(&a.target);
        let path_b = TargetInfo::path(&b.target);
        let common = path_a
            .iter()
            .zip(&path_b)
            .take_while(|(x, y)| Rc::ptr_eq(x, y))
            .count();

        match (path_a.get(common), path_b.get(common)) {
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(target_a), Some(target_b)) => {
                return target_b
                    .weight()
                    .cmp(&target_a.weight())
                    .then_with(|| target_a.id.cmp(&target_b.id));
            }
            (None, None) => {}
        }

        match (a.is_default, b.is_default) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.cmp(&b.name),
        }
    }
}

/// The name, or else the last path component of the origin with its fragment.
fn default_label(name: &str, origin: &str) -> String {
    if !name.is_empty() {
        return name.to_owned();
    }
    let Ok(url) = Url::parse(origin) else {
        return String::new();
    };
    let last = url
        .path_segments()
        .and_then(Iterator::last)
        .unwrap_or_default();
    match url.fragment() {
        Some(fragment) => format!("{last}#{fragment}"),
        None => last.to_owned(),
    }
}
