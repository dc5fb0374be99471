use std::cell::RefCell;

use chrono::Local;
use const_format::concatcp;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::cache::UserCache;
use crate::config::Credentials;
use crate::error::{Result, TrackerError};
use crate::responses::{
    transition_body, CommentBody, FilterNode, JiraUser, ResolutionNode, SearchResponse,
    TransitionsResponse, WorklogBody, JIRA_TIME_FORMAT,
};
use crate::service::IssueService;
use crate::types::{
    FieldRequirement, FieldValue, Issue, RecalculationMode, RemoteFilter, Resolution, User,
    WorkflowAction, WorklogRequest,
};

const API_ROOT: &str = "rest/api/2/";
const MYSELF_PATH: &str = concatcp!(API_ROOT, "myself");
const FAVOURITE_FILTERS_PATH: &str = concatcp!(API_ROOT, "filter/favourite");
const MY_FILTERS_PATH: &str = concatcp!(API_ROOT, "filter/my");
const SEARCH_PATH: &str = concatcp!(API_ROOT, "search");
const RESOLUTIONS_PATH: &str = concatcp!(API_ROOT, "resolution");
const ISSUE_PATH: &str = concatcp!(API_ROOT, "issue/");

const WORKLOG_COMMENT: &str = "Time logged";

/// Session with a Jira server over its REST API.
pub struct JiraClient {
    http: Client,
    base: Url,
    credentials: Credentials,
    display_names: bool,
    me: User,
    users: RefCell<UserCache>,
}

fn base_url(server_url: &str) -> Result<Url> {
    Url::parse(&format!("{}/", server_url.trim_end_matches('/')))
        .map_err(|_| TrackerError::InvalidUrl(server_url.to_string()))
}

/// Web page of an issue.
pub fn browse_url(server_url: &str, issue_key: &str) -> Result<Url> {
    base_url(server_url)?
        .join(&format!("browse/{issue_key}"))
        .map_err(|_| TrackerError::InvalidUrl(issue_key.to_string()))
}

/// JQL string literal with quotes and backslashes escaped.
fn jql_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Query for a saved filter, optionally narrowed by free text.
pub fn filter_jql(filter_id: &str, text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!("filter = {filter_id} AND text ~ {}", jql_literal(text)),
        None => format!("filter = {filter_id}"),
    }
}

/// Query for the plain text search; an empty query lists everything.
pub fn text_search_jql(query: &str) -> String {
    match query.trim() {
        "" => "ORDER BY updated DESC".to_string(),
        text => format!("text ~ {} ORDER BY updated DESC", jql_literal(text)),
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(TrackerError::ApiError {
        status: response.status().as_u16(),
        message: response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string()),
    })
}

impl JiraClient {
    fn new(base: Url, credentials: Credentials, display_names: bool, users: UserCache) -> Self {
        let me = User::new(&credentials.username, &credentials.username);
        Self {
            http: Client::new(),
            base,
            credentials,
            display_names,
            me,
            users: RefCell::new(users),
        }
    }

    /// Open a session; any failure here is an authentication failure.
    pub async fn connect(
        server_url: &str,
        credentials: Credentials,
        display_names: bool,
        users: UserCache,
    ) -> Result<Self> {
        let mut client = Self::new(base_url(server_url)?, credentials, display_names, users);

        let myself: JiraUser = client
            .get(MYSELF_PATH, &[])
            .await
            .map_err(|e| client.auth_failure(e))?;
        if let Some(me) = myself.into_user(display_names) {
            client.me = me;
        }
        let mut cache = client.users.borrow_mut();
        if cache.remember([&client.me]) {
            cache.save();
        }
        drop(cache);

        tracing::info!(user = %client.me.id, server = %client.base, "connected");
        Ok(client)
    }

    fn auth_failure(&self, error: TrackerError) -> TrackerError {
        let reason = match &error {
            TrackerError::ApiError { status, .. }
                if *status == StatusCode::UNAUTHORIZED.as_u16()
                    || *status == StatusCode::FORBIDDEN.as_u16() =>
            {
                "invalid username or API token".to_string()
            }
            other => other.to_string(),
        };
        TrackerError::AuthenticationFailed {
            user: self.credentials.username.clone(),
            reason,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|_| TrackerError::InvalidUrl(format!("{}{path}", self.base)))
    }

    fn issue_path(issue_key: &str, rest: &str) -> String {
        format!("{ISSUE_PATH}{issue_key}/{rest}")
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .header("Accept", "application/json")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let response = self
            .authorized(self.http.get(url))
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<()> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let response = self
            .authorized(self.http.post(url))
            .query(query)
            .json(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn run_search(&self, jql: String, offset: u32, limit: u32) -> Result<Vec<Issue>> {
        let query = [
            ("jql", jql),
            ("startAt", offset.to_string()),
            ("maxResults", limit.to_string()),
            ("fields", "*all".to_string()),
        ];
        let response: SearchResponse = self.get(SEARCH_PATH, &query).await?;
        let issues: Vec<Issue> = response
            .issues
            .into_iter()
            .map(|node| node.into_issue(self.display_names))
            .collect();

        self.remember_users(&issues);
        Ok(issues)
    }

    fn remember_users(&self, issues: &[Issue]) {
        let mut cache = self.users.borrow_mut();
        let seen = issues
            .iter()
            .flat_map(|issue| [issue.assignee.as_ref(), issue.reporter.as_ref()])
            .flatten();
        if cache.remember(seen) {
            cache.save();
        }
    }

    async fn transitions(&self, issue_key: &str, action_id: Option<&str>) -> Result<TransitionsResponse> {
        let mut query = Vec::new();
        if let Some(action_id) = action_id {
            query.push(("expand", "transitions.fields".to_string()));
            query.push(("transitionId", action_id.to_string()));
        }
        self.get(&Self::issue_path(issue_key, "transitions"), &query)
            .await
    }
}

/// Join the filter lists that could be fetched; fails only when none could.
fn merge_filter_lists<const N: usize>(
    lists: [(&str, Result<Vec<FilterNode>>); N],
) -> Result<Vec<RemoteFilter>> {
    let mut filters = Vec::new();
    let mut last_error = None;
    let mut fetched = false;
    for (list, result) in lists {
        match result {
            Ok(nodes) => {
                fetched = true;
                filters.extend(nodes.into_iter().map(|f| RemoteFilter::saved(f.id, f.name)));
            }
            Err(e) => {
                tracing::warn!(list, error = %e, "could not fetch saved filters");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if !fetched => Err(e),
        _ => Ok(filters),
    }
}

impl IssueService for JiraClient {
    async fn list_filters(&self) -> Result<Vec<RemoteFilter>> {
        let favourite: Result<Vec<FilterNode>> = self.get(FAVOURITE_FILTERS_PATH, &[]).await;
        let owned: Result<Vec<FilterNode>> = self.get(MY_FILTERS_PATH, &[]).await;
        merge_filter_lists([("favourite", favourite), ("owned", owned)])
    }

    async fn search(
        &self,
        filter_id: &str,
        text: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Issue>> {
        self.run_search(filter_jql(filter_id, text), offset, limit)
            .await
    }

    async fn text_search(&self, query: &str, offset: u32, limit: u32) -> Result<Vec<Issue>> {
        self.run_search(text_search_jql(query), offset, limit).await
    }

    async fn current_user(&self) -> Result<User> {
        Ok(self.me.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.borrow().users())
    }

    async fn available_actions(&self, issue_key: &str) -> Result<Vec<WorkflowAction>> {
        let response = self.transitions(issue_key, None).await?;
        Ok(response.transitions.iter().map(|t| t.action()).collect())
    }

    async fn fields_for_action(
        &self,
        issue_key: &str,
        action_id: &str,
    ) -> Result<Vec<FieldRequirement>> {
        let response = self.transitions(issue_key, Some(action_id)).await?;
        response
            .transitions
            .iter()
            .find(|t| t.id == action_id)
            .map(|t| t.requirements())
            .ok_or_else(|| TrackerError::ActionNotFound(action_id.to_string()))
    }

    async fn submit_worklog(&self, issue_key: &str, worklog: &WorklogRequest) -> Result<()> {
        let mut query = vec![("adjustEstimate", worklog.mode.adjust_param().to_string())];
        if let RecalculationMode::SetRemaining(estimate) = &worklog.mode {
            query.push(("newEstimate", estimate.clone()));
        }

        let body = WorklogBody {
            comment: WORKLOG_COMMENT,
            time_spent: &worklog.time_spent,
            started: Local::now().format(JIRA_TIME_FORMAT).to_string(),
        };
        self.post(&Self::issue_path(issue_key, "worklog"), &query, &body)
            .await
    }

    async fn execute_action(
        &self,
        issue_key: &str,
        action_id: &str,
        fields: &[FieldValue],
        comment: &str,
    ) -> Result<()> {
        let body = transition_body(action_id, fields, comment);
        self.post(&Self::issue_path(issue_key, "transitions"), &[], &body)
            .await
    }

    async fn add_comment(&self, issue_key: &str, text: &str) -> Result<()> {
        let body = CommentBody { body: text };
        self.post(&Self::issue_path(issue_key, "comment"), &[], &body)
            .await
    }

    async fn list_resolutions(&self) -> Result<Vec<Resolution>> {
        let resolutions: Vec<ResolutionNode> = self.get(RESOLUTIONS_PATH, &[]).await?;
        Ok(resolutions.into_iter().map(Resolution::from).collect())
    }
}
