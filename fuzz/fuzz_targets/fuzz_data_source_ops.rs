#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use bindery_core::Observable;
use bindery_harness::RecordingView;
use bindery_source::{DataSource, IndexPath};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Write(Vec<u8>),
    Push(u8),
    Delete(u8),
    Move(u8, u8),
    Select(u8),
    SetSelections(Vec<u8>),
}

fuzz_target!(|ops: Vec<Op>| {
    let obs = Observable::new(Vec::<u8>::new());
    let view = Rc::new(RecordingView::new());
    let source = DataSource::new(&obs, &view);
    let selections = Observable::new(Vec::new());
    source.set_selections(&selections);

    for op in ops.into_iter().take(64) {
        let len = source.number_of_items(0);
        let at = |i: u8| IndexPath::item(usize::from(i) % len.max(1));
        match op {
            Op::Write(values) => obs.set(values.into_iter().take(32).map(|v| v % 8).collect()),
            Op::Push(v) => obs.modify(|items| items.push(v % 8)),
            Op::Delete(i) if len > 0 => source.delete(at(i)),
            Op::Move(a, b) if len > 0 => source.move_item(at(a), at(b)),
            Op::Select(i) if len > 0 => source.did_select(at(i)),
            Op::SetSelections(values) => selections.set(values.into_iter().map(|v| v % 8).collect()),
            _ => {}
        }
        assert_eq!(source.items(), obs.get(), "cache diverged from model");
    }
});
