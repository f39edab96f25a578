//! `HostContext` — What the surrounding pipeline provides at validation time
//!
//! Passed explicitly to the [`RouteTableBuilder`](crate::RouteTableBuilder), so
//! tests can supply a fake host.

use crate::ConfigIssue;

/// The hosting stage, as seen by the route table builder.
pub trait HostContext {
    /// Record type the stage produces.
    type Record;

    /// Output lanes the stage declares. Routes map 1:1 onto these.
    fn output_lanes(&self) -> Vec<String>;

    /// A synthetic record for validation-time dry runs.
    ///
    /// `label` identifies the purpose, e.g. `"forValidation"`.
    fn create_record(&self, label: &str) -> Self::Record;

    /// Receive one configuration issue as soon as it is found.
    ///
    /// Default drops it; the builder returns every issue anyway.
    fn report_config_issue(&mut self, issue: &ConfigIssue) {
        let _ = issue;
    }
}
