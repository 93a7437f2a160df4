use crossbeam_channel::{Receiver, Sender};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fetch::{FetchRequest, FetchResponse};

pub const END_OF_DATA_MESSAGE: &str = "No more data available.";
pub const LOADING_MESSAGE: &str = "Loading data...";
pub const MISSING_VALUE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Buttons,
    GotoInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub header: String,
    pub value: String,
}

/// Content of the data panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Display {
    Loading,
    Row(Vec<DisplayItem>),
    EndOfData,
}

pub struct App {
    pub should_quit: bool,

    // UI state
    pub status: String,
    pub focus: Focus,
    pub show_help: bool,
    pub display: Display,

    // Navigation
    /// Zero-based index of the row last displayed successfully
    pub cursor: usize,
    /// Set when the latest row fetch failed; cleared optimistically by `go_previous`
    pub at_end: bool,
    pub headers: Vec<String>,
    /// A header fetch has been sent and not answered yet
    headers_pending: bool,
    /// Generation of the most recent row request; older responses are dropped
    generation: u64,

    // Jump-to-row input
    pub goto_input: String,

    // Channels
    pub req_tx: Sender<FetchRequest>,
    pub resp_rx: Receiver<FetchResponse>,
}

impl App {
    pub fn new(req_tx: Sender<FetchRequest>, resp_rx: Receiver<FetchResponse>) -> Self {
        Self {
            should_quit: false,
            status: "Press ? for help. n/p to step, g to jump, q to quit.".into(),
            focus: Focus::Buttons,
            show_help: false,
            display: Display::Loading,
            cursor: 0,
            at_end: false,
            headers: Vec::new(),
            headers_pending: false,
            generation: 0,
            goto_input: String::new(),
            req_tx,
            resp_rx,
        }
    }

    /// Requests the row at `index`, plus the header set if it is not cached yet.
    pub fn load_row(&mut self, index: usize) {
        self.generation += 1;
        let fetch_headers = self.headers.is_empty() && !self.headers_pending;
        self.display = Display::Loading;
        let req = FetchRequest {
            generation: self.generation,
            index,
            fetch_headers,
        };
        if self.req_tx.send(req).is_err() {
            warn!(index, "fetch worker is gone, request dropped");
            self.status = "Error: fetch worker stopped".into();
            return;
        }
        if fetch_headers {
            self.headers_pending = true;
        }
        self.status = format!("Loading row {}...", index.saturating_add(1));
    }

    /// Steps forward one row. Ignored while next is disabled.
    pub fn go_next(&mut self) {
        if !self.next_enabled() {
            self.status = "Next is disabled: end of data".into();
            return;
        }
        let Some(index) = self.cursor.checked_add(1) else {
            self.at_end = true;
            self.status = "Already at the last addressable row".into();
            return;
        };
        self.load_row(index);
    }

    pub fn go_previous(&mut self) {
        // Going back always lands on a row that existed, so re-enable next up front
        self.at_end = false;
        if self.cursor > 0 {
            self.load_row(self.cursor - 1);
        }
    }

    /// Jumps to the 1-based row `row_number`.
    pub fn go_to_row(&mut self, row_number: usize) {
        if row_number == 0 {
            return;
        }
        self.load_row(row_number - 1);
    }

    pub fn handle_fetch_response(&mut self, resp: FetchResponse) {
        if let Some(headers) = resp.headers {
            self.headers_pending = false;
            if let Ok(headers) = headers {
                if self.headers.is_empty() {
                    debug!(count = headers.len(), "header set cached");
                    self.headers = headers;
                }
            }
        }

        if resp.generation != self.generation {
            debug!(
                generation = resp.generation,
                latest = self.generation,
                index = resp.index,
                "dropping stale response"
            );
            return;
        }

        match resp.row {
            Ok(row) => {
                self.display = Display::Row(display_items(&self.headers, &row));
                self.cursor = resp.index;
                self.at_end = false;
                self.status = format!("Showing row {}", resp.index.saturating_add(1));
                info!(index = resp.index, "row displayed");
            }
            Err(_) => {
                self.display = Display::EndOfData;
                self.at_end = true;
                self.status = format!("Row {} not available", resp.index.saturating_add(1));
                info!(index = resp.index, cursor = self.cursor, "end of data");
            }
        }
    }

    pub fn prev_enabled(&self) -> bool {
        self.cursor > 0
    }

    pub fn next_enabled(&self) -> bool {
        !self.at_end
    }

    pub fn goto_enabled(&self) -> bool {
        parse_row_number(&self.goto_input).is_some()
    }

    pub fn row_counter_text(&self) -> String {
        format!("Row {}", self.cursor.saturating_add(1))
    }

    // Jump input helpers
    pub fn begin_goto_input(&mut self) {
        self.focus = Focus::GotoInput;
    }

    pub fn goto_input_insert(&mut self, c: char) {
        self.goto_input.push(c);
    }

    pub fn goto_input_backspace(&mut self) {
        self.goto_input.pop();
    }

    pub fn cancel_goto_input(&mut self) {
        self.goto_input.clear();
        self.focus = Focus::Buttons;
    }

    /// Submits the jump input. Does nothing while the go button is disabled.
    pub fn submit_goto(&mut self) -> bool {
        let Some(row_number) = parse_row_number(&self.goto_input) else {
            return false;
        };
        self.go_to_row(row_number);
        self.goto_input.clear();
        self.focus = Focus::Buttons;
        true
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.generation
    }
}

/// Parses the jump input as a 1-based row number. Accepts anything that
/// reads as a finite number whose integer part is at least 1 and fits in `usize`.
pub fn parse_row_number(input: &str) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let value: f64 = input.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let whole = value.trunc();
    // row numbers stay below usize::MAX so cursor arithmetic cannot overflow
    if whole < 1.0 || whole >= usize::MAX as f64 {
        return None;
    }
    Some(whole as usize)
}

fn display_items(headers: &[String], row: &[Value]) -> Vec<DisplayItem> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| DisplayItem {
            header: header.clone(),
            value: display_value(row.get(i)),
        })
        .collect()
}

/// Renders a field value, substituting `N/A` for absent and falsy values.
fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => MISSING_VALUE.into(),
        Some(Value::String(s)) if s.is_empty() => MISSING_VALUE.into(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => MISSING_VALUE.into(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::FetchError;
    use crate::fetch::start_fetch_worker;
    use crate::fetch::tests::MemorySource;
    use serde_json::json;

    fn new_app() -> (App, Receiver<FetchRequest>) {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (_resp_tx, resp_rx) = crossbeam_channel::unbounded();
        (App::new(req_tx, resp_rx), req_rx)
    }

    fn ok_response(req: FetchRequest, headers: &[&str], row: Value) -> FetchResponse {
        FetchResponse {
            generation: req.generation,
            index: req.index,
            headers: req
                .fetch_headers
                .then(|| Ok(headers.iter().map(|h| h.to_string()).collect())),
            row: Ok(row.as_array().cloned().unwrap_or_default()),
        }
    }

    fn missing_response(req: FetchRequest) -> FetchResponse {
        FetchResponse {
            generation: req.generation,
            index: req.index,
            headers: req.fetch_headers.then(|| Ok(vec!["Name".to_string()])),
            row: Err(FetchError::Status {
                url: format!("/api/data/{}", req.index),
                status: reqwest::StatusCode::NOT_FOUND,
            }),
        }
    }

    /// Loads `index` and answers it successfully.
    fn show_row(app: &mut App, rx: &Receiver<FetchRequest>, index: usize) {
        app.load_row(index);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(ok_response(req, &["Name", "Age"], json!(["x", "1"])));
    }

    fn texts(app: &App) -> Vec<String> {
        match &app.display {
            Display::Row(items) => items
                .iter()
                .map(|item| format!("{}: {}", item.header, item.value))
                .collect(),
            other => panic!("expected a row, got {other:?}"),
        }
    }

    #[test]
    fn first_row_pairs_headers_with_values() {
        let (mut app, rx) = new_app();
        app.load_row(0);
        assert_eq!(app.display, Display::Loading);
        let req = rx.try_recv().unwrap();
        assert_eq!(req.index, 0);
        assert!(req.fetch_headers);

        app.handle_fetch_response(ok_response(req, &["Name", "Age"], json!(["Alice", "30"])));
        assert_eq!(texts(&app), vec!["Name: Alice", "Age: 30"]);
        assert_eq!(app.row_counter_text(), "Row 1");
        assert!(!app.prev_enabled());
        assert!(app.next_enabled());
    }

    #[test]
    fn falsy_and_missing_values_show_na() {
        let (mut app, rx) = new_app();
        app.load_row(0);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(ok_response(
            req,
            &["a", "b", "c", "d", "e", "f", "g"],
            json!(["", null, 0, false, 12, true]),
        ));
        assert_eq!(
            texts(&app),
            vec!["a: N/A", "b: N/A", "c: N/A", "d: N/A", "e: 12", "f: true", "g: N/A"]
        );
    }

    #[test]
    fn next_advances_cursor_and_counter() {
        let (mut app, rx) = new_app();
        show_row(&mut app, &rx, 0);
        show_row(&mut app, &rx, 1);
        assert_eq!(app.cursor, 1);

        app.go_next();
        let req = rx.try_recv().unwrap();
        assert_eq!(req.index, 2);
        app.handle_fetch_response(ok_response(req, &[], json!(["y", "2"])));
        assert_eq!(app.cursor, 2);
        assert_eq!(app.row_counter_text(), "Row 3");
    }

    #[test]
    fn previous_at_first_row_only_reenables_next() {
        let (mut app, rx) = new_app();
        app.load_row(0);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(missing_response(req));
        assert!(!app.next_enabled());

        app.go_previous();
        assert!(rx.try_recv().is_err());
        assert!(app.next_enabled());
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn previous_enables_next_before_the_fetch_resolves() {
        let (mut app, rx) = new_app();
        show_row(&mut app, &rx, 0);
        show_row(&mut app, &rx, 1);
        app.go_next();
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(missing_response(req));
        assert!(!app.next_enabled());

        app.go_previous();
        assert!(app.next_enabled());
        assert_eq!(app.display, Display::Loading);
        assert_eq!(rx.try_recv().unwrap().index, 0);
    }

    #[test]
    fn goto_converts_to_zero_based_index() {
        let (mut app, rx) = new_app();
        for c in "5".chars() {
            app.goto_input_insert(c);
        }
        assert!(app.goto_enabled());
        assert!(app.submit_goto());
        assert_eq!(rx.try_recv().unwrap().index, 4);
        assert!(app.goto_input.is_empty());
        assert!(!app.goto_enabled());
    }

    #[test]
    fn goto_submit_ignored_while_disabled() {
        let (mut app, rx) = new_app();
        app.goto_input = "0".into();
        assert!(!app.submit_goto());
        assert!(rx.try_recv().is_err());
        assert_eq!(app.goto_input, "0");
    }

    #[test]
    fn jump_input_validation() {
        for input in ["", "abc", "0", "-3", "0.5", "NaN", "inf"] {
            assert_eq!(parse_row_number(input), None, "{input:?}");
        }
        assert_eq!(parse_row_number("1"), Some(1));
        assert_eq!(parse_row_number("42"), Some(42));
        assert_eq!(parse_row_number("2.7"), Some(2));
    }

    #[test]
    fn jump_input_rejects_numbers_past_usize() {
        assert_eq!(parse_row_number("1e300"), None);
        assert_eq!(parse_row_number("18446744073709551616"), None);
        assert!(parse_row_number("1e6").is_some());
    }

    #[test]
    fn next_at_last_addressable_row_does_not_overflow() {
        let (mut app, rx) = new_app();
        app.cursor = usize::MAX;
        assert_eq!(app.row_counter_text(), format!("Row {}", usize::MAX));

        app.go_next();
        assert!(rx.try_recv().is_err());
        assert!(!app.next_enabled());

        app.load_row(usize::MAX);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(ok_response(req, &["Name"], json!(["far"])));
        assert_eq!(app.cursor, usize::MAX);
    }

    #[test]
    fn next_is_ignored_after_end_of_data() {
        let (mut app, rx) = new_app();
        show_row(&mut app, &rx, 0);
        app.go_next();
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(missing_response(req));

        app.go_next();
        assert!(rx.try_recv().is_err());
        assert_eq!(app.display, Display::EndOfData);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn failed_send_leaves_headers_requestable() {
        let (mut app, rx) = new_app();
        drop(rx);
        app.load_row(0);
        assert!(!app.headers_pending);
        assert!(app.status.starts_with("Error"));

        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        app.req_tx = req_tx;
        app.load_row(0);
        assert!(req_rx.try_recv().unwrap().fetch_headers);
    }

    #[test]
    fn end_of_data_keeps_cursor_and_previous() {
        let (mut app, rx) = new_app();
        show_row(&mut app, &rx, 0);
        show_row(&mut app, &rx, 1);

        app.go_next();
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(missing_response(req));

        assert_eq!(app.display, Display::EndOfData);
        assert!(!app.next_enabled());
        assert!(app.prev_enabled());
        assert_eq!(app.cursor, 1);
        assert_eq!(app.row_counter_text(), "Row 2");
    }

    #[test]
    fn successful_jump_after_end_reenables_next() {
        let (mut app, rx) = new_app();
        app.go_to_row(10);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(missing_response(req));
        assert!(!app.next_enabled());

        show_row(&mut app, &rx, 2);
        assert!(app.next_enabled());
        assert_eq!(app.cursor, 2);
    }

    #[test]
    fn stale_response_is_dropped_but_headers_are_kept() {
        let (mut app, rx) = new_app();
        app.load_row(0);
        let first = rx.try_recv().unwrap();
        app.go_to_row(3);
        let second = rx.try_recv().unwrap();
        assert!(second.generation > first.generation);
        assert!(!second.fetch_headers, "header fetch already in flight");

        app.handle_fetch_response(ok_response(first, &["Name"], json!(["old"])));
        assert_eq!(app.display, Display::Loading);
        assert_eq!(app.cursor, 0);
        assert_eq!(app.headers, vec!["Name".to_string()]);

        app.handle_fetch_response(ok_response(second, &[], json!(["new"])));
        assert_eq!(texts(&app), vec!["Name: new"]);
        assert_eq!(app.cursor, 2);
        assert_eq!(app.generation(), second.generation);
    }

    #[test]
    fn failed_header_fetch_is_retried() {
        let (mut app, rx) = new_app();
        app.load_row(0);
        let req = rx.try_recv().unwrap();
        app.handle_fetch_response(FetchResponse {
            generation: req.generation,
            index: 0,
            headers: Some(Err(FetchError::Interrupted)),
            row: Ok(vec![json!("x")]),
        });
        assert_eq!(app.display, Display::Row(vec![]));

        app.go_next();
        assert!(rx.try_recv().unwrap().fetch_headers);
    }

    #[test]
    fn headers_fetched_once_across_navigation() {
        let source = MemorySource::new(
            &["Name", "Age"],
            vec![json!(["Alice", "30"]), json!(["Bob", "41"]), json!(["Carol", ""])]
                .into_iter()
                .map(|v| v.as_array().cloned().unwrap_or_default())
                .collect(),
        );
        let header_calls = source.header_calls.clone();
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded();
        let worker = thread::spawn(move || start_fetch_worker(source, req_rx, resp_tx));
        let mut app = App::new(req_tx, resp_rx);

        let settle = |app: &mut App| {
            let resp = app.resp_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            app.handle_fetch_response(resp);
        };

        app.load_row(0);
        settle(&mut app);
        for _ in 0..3 {
            app.go_next();
            settle(&mut app);
        }
        assert_eq!(app.display, Display::EndOfData);
        assert_eq!(app.cursor, 2);
        app.go_previous();
        settle(&mut app);
        app.go_to_row(1);
        settle(&mut app);
        assert_eq!(texts(&app), vec!["Name: Alice", "Age: 30"]);

        assert_eq!(header_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        drop(app);
        worker.join().unwrap();
    }
}
