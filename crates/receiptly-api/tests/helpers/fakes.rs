//! In-process stand-ins for the external capabilities.

use async_trait::async_trait;
use receiptly_core::models::{ExpenseRequest, GroupMember};
use receiptly_services::{
    Category, LedgerClient, LedgerError, LedgerGroup, LedgerUser, VisionClient, VisionError,
    VisionRequest,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
pub const TEST_AUTH_CODE: &str = "test-auth-code";

/// Vision model that answers with a fixed text and counts its calls.
pub struct FakeVision {
    answer: Mutex<String>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl FakeVision {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: Mutex::new(answer.to_string()),
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            gate: Mutex::new(None),
            entered: Notify::new(),
        }
    }

    /// Hold every following call until the returned gate is notified.
    pub fn pause(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Wait until a held call has reached the model.
    pub async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    pub fn set_answer(&self, answer: &str) {
        *self.answer.lock().unwrap() = answer.to_string();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionClient for FakeVision {
    async fn extract(&self, request: VisionRequest) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request.prompt);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VisionError::Request("connection refused".to_string()));
        }
        Ok(self.answer.lock().unwrap().clone())
    }
}

/// Ledger that records created expenses and hands out sequential ids.
pub struct FakeLedger {
    members: Mutex<Vec<GroupMember>>,
    expenses: Mutex<Vec<ExpenseRequest>>,
    create_calls: AtomicUsize,
    attach_calls: AtomicUsize,
    fail_create: AtomicBool,
    token_revoked: AtomicBool,
}

impl FakeLedger {
    pub fn new(members: Vec<GroupMember>) -> Self {
        Self {
            members: Mutex::new(members),
            expenses: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            token_revoked: AtomicBool::new(false),
        }
    }

    pub fn set_members(&self, members: Vec<GroupMember>) {
        *self.members.lock().unwrap() = members;
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every call with the issued token fail as unauthorized.
    pub fn revoke_token(&self) {
        self.token_revoked.store(true, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn expenses(&self) -> Vec<ExpenseRequest> {
        self.expenses.lock().unwrap().clone()
    }

    fn check_token(&self, access_token: &str) -> Result<(), LedgerError> {
        if access_token != TEST_ACCESS_TOKEN || self.token_revoked.load(Ordering::SeqCst) {
            return Err(LedgerError::Unauthorized("invalid token".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://ledger.test/oauth/authorize?response_type=code&redirect_uri={}&state={}",
            redirect_uri, state
        )
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<String, LedgerError> {
        if code != TEST_AUTH_CODE {
            return Err(LedgerError::Api {
                status: 400,
                message: "invalid_grant".to_string(),
            });
        }
        Ok(TEST_ACCESS_TOKEN.to_string())
    }

    async fn current_user(&self, access_token: &str) -> Result<LedgerUser, LedgerError> {
        self.check_token(access_token)?;
        Ok(LedgerUser {
            id: 100,
            first_name: "Alice".to_string(),
            last_name: Some("Smith".to_string()),
        })
    }

    async fn groups(&self, access_token: &str) -> Result<Vec<LedgerGroup>, LedgerError> {
        self.check_token(access_token)?;
        Ok(vec![
            LedgerGroup {
                id: 7,
                name: "Weekend trip".to_string(),
                members: super::fixtures::members(1),
            },
            LedgerGroup {
                id: super::TEST_GROUP_ID,
                name: "Flat".to_string(),
                members: self.members.lock().unwrap().clone(),
            },
        ])
    }

    async fn group_members(
        &self,
        access_token: &str,
        _group_id: i64,
    ) -> Result<Vec<GroupMember>, LedgerError> {
        self.check_token(access_token)?;
        Ok(self.members.lock().unwrap().clone())
    }

    async fn categories(&self, access_token: &str) -> Result<Vec<Category>, LedgerError> {
        self.check_token(access_token)?;
        Ok(vec![
            Category {
                id: 15,
                name: "Transportation / Taxi".to_string(),
            },
            Category {
                id: 12,
                name: "Food and drink / Groceries".to_string(),
            },
        ])
    }

    async fn create_expense(
        &self,
        access_token: &str,
        request: &ExpenseRequest,
    ) -> Result<String, LedgerError> {
        self.check_token(access_token)?;
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LedgerError::Rejected("group is archived".to_string()));
        }
        self.expenses.lock().unwrap().push(request.clone());
        Ok(format!("{}", 9000 + n))
    }

    async fn attach_receipt(
        &self,
        access_token: &str,
        _expense_id: &str,
        _filename: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<(), LedgerError> {
        self.check_token(access_token)?;
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
