//! Splitwise-compatible ledger client

use async_trait::async_trait;
use receiptly_core::models::{ExpenseRequest, GroupMember};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use super::{Category, LedgerClient, LedgerError, LedgerGroup, LedgerUser};

#[derive(Clone)]
pub struct SplitwiseClient {
    http_client: reqwest::Client,
    api_base_url: String,
    auth_base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl Debug for SplitwiseClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SplitwiseClient")
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .finish()
    }
}

impl SplitwiseClient {
    pub fn new(
        api_base_url: impl Into<String>,
        auth_base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to create HTTP client for ledger API, using default client");
                reqwest::Client::default()
            });

        Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            auth_base_url: auth_base_url.into().trim_end_matches('/').to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, LedgerError> {
        let response = request
            .send()
            .await
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| error_messages(&value))
            .unwrap_or(body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LedgerError::Unauthorized(message))
            }
            _ => Err(LedgerError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<T, LedgerError> {
        let response = self
            .send(
                self.http_client
                    .get(self.api_url(path))
                    .bearer_auth(access_token),
            )
            .await?;
        response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }
}

/// Collect the ledger's error payload (`error` string or `errors` map/list)
/// into one message. Empty payloads mean no error.
fn error_messages(body: &Value) -> Option<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            Value::Object(map) => map.values().for_each(|item| collect(item, out)),
            _ => {}
        }
    }

    let mut messages = Vec::new();
    if let Some(error) = body.get("error") {
        collect(error, &mut messages);
    }
    if let Some(errors) = body.get("errors") {
        collect(errors, &mut messages);
    }
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CurrentUserResponse {
    user: LedgerUser,
}

#[derive(Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<LedgerGroup>,
}

#[derive(Deserialize)]
struct GroupResponse {
    group: LedgerGroup,
}

#[derive(Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<RawCategory>,
}

#[derive(Deserialize)]
struct RawCategory {
    id: i64,
    name: String,
    #[serde(default)]
    subcategories: Vec<RawCategory>,
}

#[derive(Deserialize)]
struct CreateExpenseResponse {
    #[serde(default)]
    expenses: Vec<CreatedExpense>,
    #[serde(default)]
    errors: Value,
}

#[derive(Deserialize)]
struct CreatedExpense {
    id: Value,
}

fn flatten_categories(raw: Vec<RawCategory>) -> Vec<Category> {
    raw.into_iter()
        .flat_map(|parent| {
            if parent.subcategories.is_empty() {
                vec![Category {
                    id: parent.id,
                    name: parent.name,
                }]
            } else {
                parent
                    .subcategories
                    .into_iter()
                    .map(|sub| Category {
                        id: sub.id,
                        name: format!("{} / {}", parent.name, sub.name),
                    })
                    .collect()
            }
        })
        .collect()
}

#[async_trait]
impl LedgerClient for SplitwiseClient {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.auth_base_url,
            urlencoding::encode(&self.consumer_key),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, LedgerError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.consumer_key.as_str()),
            ("client_secret", self.consumer_secret.as_str()),
        ];
        let response = self
            .send(
                self.http_client
                    .post(format!("{}/token", self.auth_base_url))
                    .form(&params),
            )
            .await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(LedgerError::InvalidResponse(
                "token response carried an empty access token".to_string(),
            ));
        }
        Ok(token.access_token)
    }

    async fn current_user(&self, access_token: &str) -> Result<LedgerUser, LedgerError> {
        let response: CurrentUserResponse = self.get_json(access_token, "get_current_user").await?;
        Ok(response.user)
    }

    async fn groups(&self, access_token: &str) -> Result<Vec<LedgerGroup>, LedgerError> {
        let response: GroupsResponse = self.get_json(access_token, "get_groups").await?;
        let mut groups = response.groups;
        groups.sort_by_key(|group| group.members.len());
        Ok(groups)
    }

    async fn group_members(
        &self,
        access_token: &str,
        group_id: i64,
    ) -> Result<Vec<GroupMember>, LedgerError> {
        let response: GroupResponse = self
            .get_json(access_token, &format!("get_group/{}", group_id))
            .await?;
        Ok(response.group.members)
    }

    async fn categories(&self, access_token: &str) -> Result<Vec<Category>, LedgerError> {
        let response: CategoriesResponse = self.get_json(access_token, "get_categories").await?;
        Ok(flatten_categories(response.categories))
    }

    async fn create_expense(
        &self,
        access_token: &str,
        request: &ExpenseRequest,
    ) -> Result<String, LedgerError> {
        let receipt = &request.receipt;
        let mut body = json!({
            "cost": format!("{:.2}", receipt.total),
            "description": request.description(),
            "date": receipt.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "currency_code": receipt.currency_code,
            "group_id": request.group_id,
        });
        if let Value::Object(fields) = &mut body {
            fields.extend(share_fields(request));
        }
        if let Some(notes) = &receipt.notes {
            body["details"] = json!(notes);
        }
        if let Some(category_id) = request.category_id {
            body["category_id"] = json!(category_id);
        }

        let response = self
            .send(
                self.http_client
                    .post(self.api_url("create_expense"))
                    .bearer_auth(access_token)
                    .json(&body),
            )
            .await?;

        let created: CreateExpenseResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if let Some(message) = error_messages(&json!({ "errors": created.errors })) {
            return Err(LedgerError::Rejected(message));
        }

        let id = created
            .expenses
            .into_iter()
            .next()
            .map(|expense| match expense.id {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|id| !id.is_empty() && id != "null")
            .ok_or_else(|| {
                LedgerError::InvalidResponse("no expense returned by the ledger".to_string())
            })?;

        Ok(id)
    }

    async fn attach_receipt(
        &self,
        access_token: &str,
        expense_id: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), LedgerError> {
        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| LedgerError::Request(e.to_string()))?;
        let form = Form::new().part("receipt", part);

        let response = self
            .send(
                self.http_client
                    .post(self.api_url(&format!("update_expense/{}", expense_id)))
                    .bearer_auth(access_token)
                    .multipart(form),
            )
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        if let Some(message) = body.get("errors").and_then(|errors| {
            error_messages(&json!({ "errors": errors }))
        }) {
            return Err(LedgerError::Rejected(message));
        }
        Ok(())
    }
}

/// Per-user `users__{i}__*` fields for an expense.
///
/// The payer is listed with the full cost as paid share, and is appended with
/// a zero owed share when not among the split members.
fn share_fields(request: &ExpenseRequest) -> serde_json::Map<String, Value> {
    let cost = format!("{:.2}", request.receipt.total);
    let mut users: Vec<(i64, String)> = request
        .shares
        .iter()
        .map(|share| (share.member.id, format!("{:.2}", share.owed)))
        .collect();
    if !users.iter().any(|(id, _)| *id == request.paid_by) {
        users.push((request.paid_by, "0.00".to_string()));
    }

    let mut fields = serde_json::Map::new();
    for (i, (user_id, owed)) in users.into_iter().enumerate() {
        let paid = if user_id == request.paid_by {
            cost.clone()
        } else {
            "0.00".to_string()
        };
        fields.insert(format!("users__{}__user_id", i), json!(user_id));
        fields.insert(format!("users__{}__paid_share", i), json!(paid));
        fields.insert(format!("users__{}__owed_share", i), json!(owed));
    }
    fields
}
