use std::cell::Cell;
use std::rc::Rc;

use crate::dom::{Document, Event, NodeRef};
use crate::host::Host;

/// Parse `html` and wrap the first element in `<body>` as the host.
pub(crate) fn fixture(html: &str) -> (Rc<Document>, Host) {
    let doc = Document::parse(html).unwrap();
    let element = doc.body().element_children().remove(0);
    let host = Host::new(doc.clone(), element).unwrap();
    (doc, host)
}

pub(crate) fn by_id(root: &NodeRef, id: &str) -> NodeRef {
    root.select(&format!("#{}", id))
        .unwrap()
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("no element with id {}", id))
}

/// Define `name` on `host` as a handler that counts its invocations.
pub(crate) fn counting_action(host: &Host, name: &str) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let sink = count.clone();
    host.define_action(name, move |_: &Event| sink.set(sink.get() + 1));
    count
}
