//! `Record` — The host's unit of input, as seen by the router
//!
//! The router only needs a stable identifier for diagnostics. Evaluators that
//! read record contents (such as the built-in [`el`](crate::el) evaluator)
//! require the richer [`RecordData`] view.

use crate::Value;
use std::fmt::Debug;

/// A record flowing through the router.
///
/// Records are owned by the host. The router borrows a record for exactly one
/// routing pass and hands the same reference to the dispatch sink.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so distinct records can be routed
/// concurrently from multiple threads.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Record`",
    label = "this type cannot be routed",
    note = "implement `source_id(&self) -> &str` to route this type"
)]
pub trait Record: Send + Sync + Debug {
    /// Stable identifier of this record, used in diagnostics and record errors.
    fn source_id(&self) -> &str;
}

/// Field and attribute access over a record.
///
/// Paths use `/`-separated segments with optional `[index]` list access, e.g.
/// `/order/items[0]/sku`. The empty path `""` addresses the record root.
///
/// # Example
///
/// ```
/// use lanes::{Record, RecordData, Value};
///
/// #[derive(Debug)]
/// struct Reading { id: String, celsius: f64 }
///
/// impl Record for Reading {
///     fn source_id(&self) -> &str { &self.id }
/// }
///
/// impl RecordData for Reading {
///     fn field(&self, path: &str) -> Option<Value> {
///         (path == "/celsius").then(|| Value::Float(self.celsius))
///     }
/// }
///
/// let r = Reading { id: "r-1".into(), celsius: 21.5 };
/// assert_eq!(r.field("/celsius"), Some(Value::Float(21.5)));
/// assert_eq!(r.attribute("topic"), None);
/// ```
pub trait RecordData: Record {
    /// Value at `path`, or `None` if the field does not exist.
    ///
    /// A field that exists with a null value returns `Some(Value::Null)`.
    fn field(&self, path: &str) -> Option<Value>;

    /// Header attribute by name, or `None` if not set.
    fn attribute(&self, name: &str) -> Option<&str> {
        let _ = name;
        None
    }
}

// Blanket implementations for references and boxes
#[diagnostic::do_not_recommend]
impl<R: Record + ?Sized> Record for &R {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }
}

#[diagnostic::do_not_recommend]
impl<R: RecordData + ?Sized> RecordData for &R {
    fn field(&self, path: &str) -> Option<Value> {
        (**self).field(path)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        (**self).attribute(name)
    }
}

#[diagnostic::do_not_recommend]
impl<R: Record + ?Sized> Record for Box<R> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }
}

#[diagnostic::do_not_recommend]
impl<R: RecordData + ?Sized> RecordData for Box<R> {
    fn field(&self, path: &str) -> Option<Value> {
        (**self).field(path)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        (**self).attribute(name)
    }
}
