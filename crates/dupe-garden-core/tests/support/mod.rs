#![allow(dead_code)]

use async_trait::async_trait;
use dupe_garden_core::activity::{ActivitySink, NewActivity};
use dupe_garden_core::backend::{
    BulkDeleteResponse, DeleteBulkRequest, DeleteSingleRequest, DuplicateBackend, ScanRequest,
    ScanResponse,
};
use dupe_garden_core::model::{
    DuplicateKind, DuplicateRecord, ProjectResource, ProjectResources, RecordStatus, Service,
};
use dupe_garden_core::payload::DuplicatePayload;
use dupe_garden_core::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Scan(ScanRequest),
    DeleteSingle(DeleteSingleRequest),
    DeleteBulk(DeleteBulkRequest),
}

/// What the fake answers to the next scan.
#[derive(Debug, Clone)]
pub enum FakeScan {
    Records(Vec<DuplicateRecord>),
    Status(String),
    HttpError(u16, String),
    /// A raw JSON response body, decoded the way the HTTP backend decodes it.
    Body(String),
}

/// In-memory backend that records every call.
pub struct FakeBackend {
    pub next_scan: Mutex<FakeScan>,
    pub bulk_response: Mutex<Option<BulkDeleteResponse>>,
    pub single_fails: AtomicBool,
    pub calls: Mutex<Vec<Call>>,
    scan_count: AtomicUsize,
    hold_first_scan: bool,
    entered: Notify,
    gate: Notify,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            next_scan: Mutex::new(FakeScan::Records(Vec::new())),
            bulk_response: Mutex::new(None),
            single_fails: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            scan_count: AtomicUsize::new(0),
            hold_first_scan: false,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }
}

impl FakeBackend {
    pub fn with_records(records: Vec<DuplicateRecord>) -> Self {
        let backend = Self::default();
        backend.set_scan(FakeScan::Records(records));
        backend
    }

    /// Make the first scan block until [`release`](Self::release).
    pub fn holding_first_scan(mut self) -> Self {
        self.hold_first_scan = true;
        self
    }

    pub fn set_scan(&self, scan: FakeScan) {
        *self.next_scan.lock().unwrap() = scan;
    }

    pub fn set_bulk_response(&self, success_count: usize, fail_count: usize) {
        *self.bulk_response.lock().unwrap() = Some(BulkDeleteResponse {
            success_count,
            fail_count,
            errors: Vec::new(),
        });
    }

    pub async fn wait_until_scanning(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scan_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Scan(_)))
            .count()
    }
}

#[async_trait]
impl DuplicateBackend for FakeBackend {
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, Error> {
        self.calls.lock().unwrap().push(Call::Scan(request.clone()));
        let nth = self.scan_count.fetch_add(1, Ordering::SeqCst);
        if self.hold_first_scan && nth == 0 {
            self.entered.notify_one();
            self.gate.notified().await;
        }

        let scan = self.next_scan.lock().unwrap().clone();
        match scan {
            FakeScan::Records(records) => Ok(ScanResponse::success(records)),
            FakeScan::Status(status) => Ok(ScanResponse {
                status,
                data: Vec::new(),
                message: Some("backend refused".to_string()),
            }),
            FakeScan::HttpError(status, message) => Err(Error::Backend { status, message }),
            FakeScan::Body(body) => Ok(serde_json::from_str(&body)?),
        }
    }

    async fn delete_single(&self, request: &DeleteSingleRequest) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::DeleteSingle(request.clone()));
        if self.single_fails.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                status: 500,
                message: "Duplicate not found".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_bulk(&self, request: &DeleteBulkRequest) -> Result<BulkDeleteResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::DeleteBulk(request.clone()));
        let response = self.bulk_response.lock().unwrap().clone();
        response.ok_or_else(|| Error::Backend {
            status: 503,
            message: "unavailable".to_string(),
        })
    }

    async fn list_resources(
        &self,
        _user_id: &str,
        _project_id: &str,
    ) -> Result<ProjectResources, Error> {
        Ok(ProjectResources {
            databases: vec![resource("db1", "Main")],
            storages: vec![resource("bucket1", "Uploads")],
        })
    }

    async fn list_collections(
        &self,
        _user_id: &str,
        _project_id: &str,
        database_id: &str,
    ) -> Result<Vec<ProjectResource>, Error> {
        Ok(vec![resource(&format!("{}-posts", database_id), "Posts")])
    }
}

/// Activity sink that keeps everything in memory, optionally failing every write.
#[derive(Default)]
pub struct RecordingSink {
    pub recorded: Mutex<Vec<NewActivity>>,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.message.clone())
            .collect()
    }
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn record(&self, activity: &NewActivity) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Other("activity service down".to_string()));
        }
        self.recorded.lock().unwrap().push(activity.clone());
        Ok(())
    }
}

pub fn resource(id: &str, name: &str) -> ProjectResource {
    ProjectResource {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn duplicate(id: &str, kind: DuplicateKind, name: Option<&str>, score: Option<f64>) -> DuplicateRecord {
    DuplicateRecord {
        id: id.to_string(),
        service: Service::Storage,
        kind,
        original_id: format!("orig-{}", id),
        duplicate_id: format!("file-{}", id),
        payload: DuplicatePayload {
            name: name.map(str::to_string),
            similarity_score: score,
            ..Default::default()
        },
        status: RecordStatus::Active,
        database_id: None,
        collection_id: None,
        bucket_id: Some("bucket1".to_string()),
    }
}
