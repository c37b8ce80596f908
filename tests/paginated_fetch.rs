use pipeline_builder::pipeline::{
    clamp_page, Page, PageOutcome, PageSource, PageWindow, PagedFetchController,
};
use pipeline_builder::remote::RemoteError;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Page source whose reads block until the test releases that page number.
struct GatedSource {
    gates: Mutex<HashMap<u32, mpsc::Receiver<()>>>,
    started: Mutex<mpsc::Sender<u32>>,
}

impl PageSource<String> for GatedSource {
    fn fetch_page(&self, window: &PageWindow) -> Result<Page<String>, RemoteError> {
        let gate = self
            .gates
            .lock()
            .expect("gates")
            .remove(&window.page_number)
            .expect("gate for page");
        self.started
            .lock()
            .expect("started")
            .send(window.page_number)
            .expect("signal start");
        gate.recv_timeout(Duration::from_secs(5)).expect("released");
        Ok(Page {
            items: vec![format!("row-from-page-{}", window.page_number)],
            total_pages: 3,
        })
    }
}

#[test]
fn only_the_latest_page_is_displayed_when_responses_arrive_out_of_order() {
    let (started_tx, started_rx) = mpsc::channel();
    let mut releases = HashMap::new();
    let mut gates = HashMap::new();
    for page in 1..=3 {
        let (tx, rx) = mpsc::channel();
        releases.insert(page, tx);
        gates.insert(page, rx);
    }
    let source = Arc::new(GatedSource {
        gates: Mutex::new(gates),
        started: Mutex::new(started_tx),
    });
    let controller = Arc::new(PagedFetchController::<String>::new());

    let mut workers = HashMap::new();
    for page in 1..=3 {
        let source = Arc::clone(&source);
        let controller = Arc::clone(&controller);
        workers.insert(
            page,
            thread::spawn(move || {
                controller.fetch(source.as_ref(), PageWindow::new("preview:run-1", page, 10))
            }),
        );
        // Requests are issued strictly in page order.
        assert_eq!(
            started_rx.recv_timeout(Duration::from_secs(5)).expect("started"),
            page
        );
    }

    let mut outcomes = HashMap::new();
    for page in [3, 1, 2] {
        releases[&page].send(()).expect("release");
        let worker = workers.remove(&page).expect("worker");
        outcomes.insert(page, worker.join().expect("join"));
    }

    assert_eq!(outcomes[&3], PageOutcome::Applied);
    assert_eq!(outcomes[&1], PageOutcome::Superseded);
    assert_eq!(outcomes[&2], PageOutcome::Superseded);

    let view = controller.view("preview:run-1").expect("view");
    assert_eq!(view.page_number, Some(3));
    assert_eq!(view.items, vec!["row-from-page-3".to_string()]);
    assert_eq!(view.error, None);
    assert!(!view.pending);
}

#[test]
fn stale_data_survives_a_failed_latest_request() {
    let controller = PagedFetchController::<u32>::new();
    let first = controller.request(PageWindow::new("report:run-1", 1, 9));
    controller.complete(
        first,
        Ok(Page {
            items: vec![1, 2, 3],
            total_pages: 2,
        }),
    );

    let second = controller.request(PageWindow::new("report:run-1", 2, 9));
    assert!(controller.view("report:run-1").expect("view").pending);
    let outcome = controller.complete(
        second,
        Err(RemoteError::new(None, "Failed to fetch results.")),
    );
    assert_eq!(outcome, PageOutcome::Applied);

    let view = controller.view("report:run-1").expect("view");
    assert_eq!(view.items, vec![1, 2, 3]);
    assert_eq!(view.page_number, Some(1));
    assert_eq!(view.total_pages, Some(2));
    assert_eq!(
        view.error,
        Some(RemoteError::new(None, "Failed to fetch results."))
    );
}

#[test]
fn a_ticket_cannot_be_applied_twice() {
    let controller = PagedFetchController::<u32>::new();
    let ticket = controller.request(PageWindow::new("k", 1, 5));
    let page = Page {
        items: vec![7],
        total_pages: 1,
    };
    assert_eq!(
        controller.complete(ticket.clone(), Ok(page.clone())),
        PageOutcome::Applied
    );
    assert_eq!(controller.complete(ticket, Ok(page)), PageOutcome::Superseded);
}

#[test]
fn requested_pages_are_clamped_to_known_totals() {
    let controller = PagedFetchController::<u32>::new();
    assert_eq!(clamp_page(5, controller.total_pages("k")), 5);
    let ticket = controller.request(PageWindow::new("k", 1, 5));
    controller.complete(
        ticket,
        Ok(Page {
            items: vec![],
            total_pages: 2,
        }),
    );
    assert_eq!(clamp_page(5, controller.total_pages("k")), 2);
    assert_eq!(clamp_page(0, controller.total_pages("k")), 1);
    let view = controller.view("k").expect("view");
    assert_eq!(view.requested_page, Some(1));
    assert_eq!(view.page_number, Some(1));
}
