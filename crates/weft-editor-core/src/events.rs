//! Input and selection event coalescing.
//!
//! Browsers fire `input` while an IME composition is still running and
//! report mouse selections before they settle. [`ChangeEvents`] defers those
//! callbacks through a [`Scheduler`] and drops deferred input that lands
//! mid-composition. Deferred callbacks are never merged: two inputs inside
//! one delay window fire twice.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::constants::{CARD_ELEMENT_KEY, DATA_ELEMENT, EDITABLE, ROOT, UI};
use crate::document::EditorDocument;
use crate::dom::{Dom, NodeId};
use crate::range::DomRange;

/// Delay applied to deferred callbacks unless configured otherwise.
pub const DEFAULT_INPUT_DELAY: Duration = Duration::from_millis(10);

/// Runs a one-shot task after a delay. There is no cancellation.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}

struct Task {
    due: Duration,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    seq: u64,
    tasks: Vec<Task>,
}

/// Scheduler over a virtual clock, advanced by hand.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().tasks.len()
    }

    /// Move the clock forward, running every task that comes due in
    /// order. Tasks scheduled while advancing run too if they fall inside
    /// the window. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.queue.borrow().now + by;
        let mut ran = 0;
        loop {
            let task = {
                let mut queue = self.queue.borrow_mut();
                let next = queue
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due <= target)
                    .min_by_key(|(_, task)| (task.due, task.seq))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let task = queue.tasks.remove(index);
                        queue.now = task.due;
                        task
                    }
                    None => break,
                }
            };
            (task.run)();
            ran += 1;
        }
        self.queue.borrow_mut().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let mut queue = self.queue.borrow_mut();
        let due = queue.now + delay;
        queue.seq += 1;
        let seq = queue.seq;
        queue.tasks.push(Task {
            due,
            seq,
            run: task,
        });
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &queue.now)
            .field("pending", &queue.tasks.len())
            .finish()
    }
}

/// Whether an event at `node` belongs to an input inside a card (or to
/// editor chrome) rather than to the editable surface.
pub fn is_card_input(dom: &Dom, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(node) = current {
        match dom.attr(node, DATA_ELEMENT) {
            Some(ROOT) | Some(EDITABLE) => return false,
            Some(UI) => return true,
            _ => {}
        }
        if dom.attr(node, CARD_ELEMENT_KEY) == Some("center") {
            return true;
        }
        current = dom.parent(node);
    }
    false
}

/// Keys that can move the selection without changing content.
fn is_selection_key(key: &str, ctrl: bool) -> bool {
    match key {
        "ArrowLeft" | "ArrowRight" | "ArrowUp" | "ArrowDown" | "Home" | "End" | "Meta" => true,
        "b" | "f" | "n" | "p" | "a" | "e" => ctrl,
        _ => false,
    }
}

/// Coalesces raw input, composition, pointer and key events into change and
/// selection callbacks.
pub struct ChangeEvents<S> {
    scheduler: S,
    delay: Duration,
    composing: Rc<Cell<bool>>,
    selecting: bool,
    keydown_range: Option<DomRange>,
    composition_ended_at: Option<Instant>,
}

impl<S: Scheduler> ChangeEvents<S> {
    pub fn new(scheduler: S, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            composing: Rc::new(Cell::new(false)),
            selecting: false,
            keydown_range: None,
            composition_ended_at: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_composing(&self) -> bool {
        self.composing.get()
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// When the last composition ended, if any did.
    pub fn composition_ended_at(&self) -> Option<Instant> {
        self.composition_ended_at
    }

    pub fn on_composition_start<D: EditorDocument>(&mut self, editor: &D) {
        if editor.readonly() {
            return;
        }
        tracing::debug!("compositionstart");
        self.composing.set(true);
    }

    pub fn on_composition_end<D: EditorDocument>(&mut self, editor: &D) {
        if editor.readonly() {
            return;
        }
        tracing::debug!("compositionend");
        self.composing.set(false);
        self.composition_ended_at = Some(Instant::now());
    }

    /// Defer `callback` for an `input` event at `target`.
    ///
    /// Ignored on a read-only editor and for inputs inside cards. The
    /// composition state is checked when the callback comes due, not now.
    /// Returns whether a callback was scheduled.
    pub fn on_input<D: EditorDocument>(
        &self,
        editor: &D,
        target: NodeId,
        callback: impl FnOnce() + 'static,
    ) -> bool {
        if editor.readonly() || is_card_input(editor.dom(), target) {
            return false;
        }
        let composing = Rc::clone(&self.composing);
        self.scheduler.schedule(
            self.delay,
            Box::new(move || {
                if composing.get() {
                    tracing::trace!("deferred input dropped during composition");
                    return;
                }
                callback();
            }),
        );
        tracing::trace!(delay = ?self.delay, "input deferred");
        true
    }

    /// Start tracking a pointer selection unless it begins inside a card.
    pub fn on_mouse_down(&mut self, dom: &Dom, target: NodeId) {
        if is_card_input(dom, target) {
            return;
        }
        self.selecting = true;
    }

    /// Finish a pointer selection, deferring `callback` until the browser
    /// has settled the range. Returns whether a callback was scheduled.
    pub fn on_mouse_up(&mut self, callback: impl FnOnce() + 'static) -> bool {
        if !self.selecting {
            return false;
        }
        self.selecting = false;
        self.scheduler.schedule(self.delay, Box::new(callback));
        true
    }

    /// Remember the selection before a key goes down.
    pub fn on_key_down(&mut self, range: Option<DomRange>) {
        self.keydown_range = range;
    }

    /// Report keyboard selection moves.
    ///
    /// Runs `callback` right away for navigation keys that actually moved
    /// the range, unless composing. Returns whether it ran.
    pub fn on_key_up<D: EditorDocument>(
        &mut self,
        editor: &D,
        target: NodeId,
        key: &str,
        ctrl: bool,
        callback: impl FnOnce(),
    ) -> bool {
        if editor.readonly() || is_card_input(editor.dom(), target) {
            return false;
        }
        if !is_selection_key(key, ctrl) {
            return false;
        }
        let range = editor.range();
        if range.is_some() && range == self.keydown_range {
            return false;
        }
        if self.composing.get() {
            return false;
        }
        callback();
        true
    }
}

impl<S> std::fmt::Debug for ChangeEvents<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEvents")
            .field("delay", &self.delay)
            .field("composing", &self.composing.get())
            .field("selecting", &self.selecting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainEditor;
    use crate::range::DomPoint;
    use crate::schema::Schema;

    const MS: Duration = Duration::from_millis(1);

    type Fired = Rc<RefCell<Vec<&'static str>>>;

    fn recorder(fired: &Fired, label: &'static str) -> impl FnOnce() + 'static {
        let fired = Rc::clone(fired);
        move || fired.borrow_mut().push(label)
    }

    fn setup() -> (PlainEditor, ChangeEvents<ManualScheduler>, ManualScheduler, Fired) {
        let editor = PlainEditor::with_html(
            Schema::with_defaults(),
            r#"<p>text</p><div data-card-key="video"><div data-card-element="center"><span>inner</span><div data-element="editable">island</div></div></div><div data-element="ui">toolbar</div>"#,
        );
        let scheduler = ManualScheduler::new();
        let events = ChangeEvents::new(scheduler.clone(), DEFAULT_INPUT_DELAY);
        (editor, events, scheduler, Rc::default())
    }

    fn node(editor: &PlainEditor, path: &[usize]) -> NodeId {
        let mut node = editor.container();
        for index in path {
            node = editor.dom().children(node)[*index];
        }
        node
    }

    #[test]
    fn test_is_card_input() {
        let (editor, ..) = setup();
        let dom = editor.dom();
        assert!(!is_card_input(dom, node(&editor, &[0, 0])));
        assert!(is_card_input(dom, node(&editor, &[1, 0, 0])));
        assert!(!is_card_input(dom, node(&editor, &[1, 0, 1, 0])));
        assert!(is_card_input(dom, node(&editor, &[2, 0])));
        assert!(!is_card_input(dom, dom.body()));
    }

    #[test]
    fn test_input_fires_after_delay() {
        let (editor, events, scheduler, fired) = setup();
        let p = node(&editor, &[0]);
        assert!(events.on_input(&editor, p, recorder(&fired, "input")));
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.advance(9 * MS), 0);
        assert!(fired.borrow().is_empty());
        assert_eq!(scheduler.advance(MS), 1);
        assert_eq!(*fired.borrow(), ["input"]);
        assert_eq!(scheduler.now(), 10 * MS);
    }

    #[test]
    fn test_input_ignored_in_cards_and_readonly() {
        let (mut editor, events, scheduler, fired) = setup();
        let inner = node(&editor, &[1, 0, 0]);
        assert!(!events.on_input(&editor, inner, recorder(&fired, "card")));

        editor.set_readonly(true);
        let p = node(&editor, &[0]);
        assert!(!events.on_input(&editor, p, recorder(&fired, "readonly")));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_input_dropped_while_composing() {
        let (editor, mut events, scheduler, fired) = setup();
        let p = node(&editor, &[0]);

        events.on_composition_start(&editor);
        assert!(events.is_composing());
        events.on_input(&editor, p, recorder(&fired, "dropped"));
        scheduler.advance(DEFAULT_INPUT_DELAY);
        assert!(fired.borrow().is_empty());

        // Ending the composition before the callback is due lets it through.
        events.on_input(&editor, p, recorder(&fired, "kept"));
        events.on_composition_end(&editor);
        assert!(events.composition_ended_at().is_some());
        scheduler.advance(DEFAULT_INPUT_DELAY);
        assert_eq!(*fired.borrow(), ["kept"]);
    }

    #[test]
    fn test_readonly_ignores_composition() {
        let (mut editor, mut events, ..) = setup();
        editor.set_readonly(true);
        events.on_composition_start(&editor);
        assert!(!events.is_composing());
    }

    #[test]
    fn test_overlapping_inputs_fire_twice() {
        let (editor, events, scheduler, fired) = setup();
        let p = node(&editor, &[0]);
        events.on_input(&editor, p, recorder(&fired, "first"));
        scheduler.advance(5 * MS);
        events.on_input(&editor, p, recorder(&fired, "second"));
        assert_eq!(scheduler.advance(20 * MS), 2);
        assert_eq!(*fired.borrow(), ["first", "second"]);
    }

    #[test]
    fn test_mouse_selection_is_deferred() {
        let (editor, mut events, scheduler, fired) = setup();
        assert!(!events.on_mouse_up(recorder(&fired, "stray")));

        events.on_mouse_down(editor.dom(), node(&editor, &[1, 0, 0]));
        assert!(!events.is_selecting());

        events.on_mouse_down(editor.dom(), node(&editor, &[0, 0]));
        assert!(events.is_selecting());
        assert!(events.on_mouse_up(recorder(&fired, "select")));
        assert!(!events.is_selecting());
        assert!(fired.borrow().is_empty());
        scheduler.advance(DEFAULT_INPUT_DELAY);
        assert_eq!(*fired.borrow(), ["select"]);
    }

    #[test]
    fn test_key_up_reports_moved_selection() {
        let (mut editor, mut events, _, fired) = setup();
        let text = node(&editor, &[0, 0]);
        let before = DomRange::collapsed_at(DomPoint::new(text, 1));
        editor.select_range(before);
        events.on_key_down(editor.range());

        assert!(!events.on_key_up(&editor, text, "ArrowLeft", false, recorder(&fired, "same")));

        editor.select_range(DomRange::collapsed_at(DomPoint::new(text, 0)));
        assert!(!events.on_key_up(&editor, text, "x", false, recorder(&fired, "typing")));
        assert!(!events.on_key_up(&editor, text, "a", false, recorder(&fired, "plain a")));
        assert!(events.on_key_up(&editor, text, "a", true, recorder(&fired, "ctrl a")));
        assert!(events.on_key_up(&editor, text, "ArrowLeft", false, recorder(&fired, "moved")));
        assert_eq!(*fired.borrow(), ["ctrl a", "moved"]);
    }
}
