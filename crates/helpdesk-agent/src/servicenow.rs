//! ServiceNow Table API client.
//!
//! Implements both [`Ticketing`] (incident creation) and [`TicketLookup`]
//! (fetch / update). Callers are identified by e-mail and resolved to a
//! `sys_user` record before any incident call that needs them.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use triage::{
    CollaboratorError, EscalationTicket, IncidentState, TicketLookup, TicketReceipt,
    TicketStatusChange, TicketSummary, Ticketing,
};

use crate::config::ServiceNowEndpoint;
use crate::{expect_success, read_json, transport_error};

const CLOSE_CODE: &str = "Solved (Permanently)";
const CLOSE_NOTES: &str = "Closed by the caller through the helpdesk assistant";

pub struct ServiceNowClient {
    endpoint: ServiceNowEndpoint,
    client: reqwest::Client,
    timeout: Duration,
}

impl ServiceNowClient {
    pub fn new(endpoint: ServiceNowEndpoint, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/now/table/{path}", self.endpoint.base_url);
        self.client
            .request(method, url)
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, CollaboratorError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        read_json(expect_success(response).await?).await
    }

    /// Rows of a table query.
    async fn query(
        &self,
        table: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Value>, CollaboratorError> {
        let limit = limit.to_string();
        let request = self.request(Method::GET, table).query(&[
            ("sysparm_query", query),
            ("sysparm_limit", limit.as_str()),
        ]);
        let body = self.send(request).await?;
        Ok(body["result"].as_array().cloned().unwrap_or_default())
    }

    async fn caller_sys_id(&self, email: &str) -> Result<String, CollaboratorError> {
        let email = query_value(email)?;
        let users = self.query("sys_user", &format!("email={email}"), 1).await?;
        users
            .first()
            .and_then(|u| u["sys_id"].as_str())
            .map(String::from)
            .ok_or_else(|| {
                CollaboratorError::Rejected(format!("No user found with Email Id {email}"))
            })
    }

    async fn incident_sys_id(&self, number: &str) -> Result<String, CollaboratorError> {
        let number = query_value(number)?;
        let rows = self.query("incident", &format!("number={number}"), 1).await?;
        rows.first()
            .and_then(|r| r["sys_id"].as_str())
            .map(String::from)
            .ok_or_else(|| {
                CollaboratorError::Rejected(format!("No incident found with ID {number}"))
            })
    }

    async fn caller_incidents(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<TicketSummary>, CollaboratorError> {
        let sys_id = self.caller_sys_id(email).await?;
        let query = format!("caller_id={sys_id}^ORDERBYDESCsys_created_on");
        let rows = self.query("incident", &query, limit).await?;
        Ok(rows.iter().map(summary).collect())
    }

    async fn write_incident(
        &self,
        method: Method,
        number: &str,
        body: Value,
    ) -> Result<TicketSummary, CollaboratorError> {
        let sys_id = self.incident_sys_id(number).await?;
        let request = self.request(method, &format!("incident/{sys_id}")).json(&body);
        let updated = self.send(request).await?;
        if updated["result"].is_null() {
            return Err(CollaboratorError::Parse("No result returned from the API".into()));
        }
        Ok(summary(&updated["result"]))
    }
}

/// Stand-in when no instance is configured: every escalation fails with a
/// readable reason instead of a transport error.
pub struct TicketingDisabled;

#[async_trait]
impl Ticketing for TicketingDisabled {
    async fn create_incident(
        &self,
        _caller: Option<&str>,
        _ticket: &EscalationTicket,
    ) -> Result<TicketReceipt, CollaboratorError> {
        Err(CollaboratorError::Rejected("Ticketing is not configured".into()))
    }
}

/// A value spliced into an encoded query. `^` separates query terms, so a
/// value carrying one could widen the query to other records.
fn query_value(value: &str) -> Result<&str, CollaboratorError> {
    let value = value.trim();
    if value.is_empty() || value.contains(['^', '\n', '\r']) {
        return Err(CollaboratorError::Rejected(format!(
            "'{value}' is not a valid lookup value"
        )));
    }
    Ok(value)
}

fn summary(row: &Value) -> TicketSummary {
    TicketSummary {
        number: row["number"].as_str().unwrap_or_default().to_string(),
        description: row["description"]
            .as_str()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description available")
            .to_string(),
        state: IncidentState::from_code(row["incident_state"].as_str().unwrap_or_default()),
    }
}

#[async_trait]
impl Ticketing for ServiceNowClient {
    async fn create_incident(
        &self,
        caller: Option<&str>,
        ticket: &EscalationTicket,
    ) -> Result<TicketReceipt, CollaboratorError> {
        let mut body = json!({
            "short_description": ticket.short_description,
            "description": ticket.description,
            "category": ticket.category,
        });
        if let Some(email) = caller {
            body["caller_id"] = Value::String(self.caller_sys_id(email).await?);
        }

        let response = self
            .request(Method::POST, "incident")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if response.status() != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Rejected(format!(
                "Error creating incident ticket : {text}"
            )));
        }

        let created = read_json(response).await?;
        let number = created["result"]["number"]
            .as_str()
            .ok_or_else(|| CollaboratorError::Parse("created incident has no number".into()))?;
        Ok(TicketReceipt {
            number: number.to_string(),
        })
    }
}

#[async_trait]
impl TicketLookup for ServiceNowClient {
    async fn find_by_number(
        &self,
        number: &str,
    ) -> Result<Option<TicketSummary>, CollaboratorError> {
        let number = query_value(number)?;
        let rows = self.query("incident", &format!("number={number}"), 1).await?;
        Ok(rows.first().map(summary))
    }

    async fn latest_for_caller(
        &self,
        caller: &str,
    ) -> Result<Option<TicketSummary>, CollaboratorError> {
        Ok(self.caller_incidents(caller, 1).await?.into_iter().next())
    }

    async fn recent_for_caller(
        &self,
        caller: &str,
        limit: usize,
    ) -> Result<Vec<TicketSummary>, CollaboratorError> {
        self.caller_incidents(caller, limit).await
    }

    async fn update_description(
        &self,
        number: &str,
        description: &str,
    ) -> Result<TicketSummary, CollaboratorError> {
        self.write_incident(Method::PUT, number, json!({ "description": description }))
            .await
    }

    async fn update_status(
        &self,
        number: &str,
        change: TicketStatusChange,
    ) -> Result<TicketSummary, CollaboratorError> {
        let body = json!({
            "state": change.state_code().to_string(),
            "close_code": CLOSE_CODE,
            "close_notes": CLOSE_NOTES,
        });
        self.write_incident(Method::PATCH, number, body).await
    }
}
