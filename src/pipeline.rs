//! Remote fetch plus local filtering of the issue list.
//!
//! Only a change of the remote filter (or the text of a text-search filter)
//! goes back to the server. Assignee, status and text refinements are applied
//! to the issues already fetched.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::actions::AssigneeChoice;
use crate::error::{Result, TrackerError};
use crate::service::IssueService;
use crate::selection::SelectableCollection;
use crate::types::{Facet, Faceted, Identifiable, Issue, IssueState, RemoteFilter, User};

/// Number of issues requested per remote fetch.
pub const PAGE_SIZE: u32 = 50;

/// Keys used by `export_state` and `import_state`.
pub const STATE_FILTER_KEY: &str = "filter";
pub const STATE_ASSIGNEE_KEY: &str = "assignee";
pub const STATE_STATUS_KEY: &str = "status";

pub struct FilterPipeline<'a, S> {
    service: &'a S,
    page_size: u32,
    filters: SelectableCollection<RemoteFilter>,
    assignee_filter: SelectableCollection<Facet<User>>,
    status_filter: SelectableCollection<Facet<IssueState>>,
    text_filter: String,
    last_text_filter: String,
    found: Vec<Issue>,
    visible: SelectableCollection<Issue>,
    selected: HashSet<String>,
    assignees: SelectableCollection<AssigneeChoice>,
}

impl<'a, S: IssueService> FilterPipeline<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self::with_page_size(service, PAGE_SIZE)
    }

    pub fn with_page_size(service: &'a S, page_size: u32) -> Self {
        Self {
            service,
            page_size,
            filters: SelectableCollection::new(false),
            assignee_filter: SelectableCollection::new(true),
            status_filter: SelectableCollection::new(true),
            text_filter: String::new(),
            last_text_filter: String::new(),
            found: Vec::new(),
            visible: SelectableCollection::new(false),
            selected: HashSet::new(),
            assignees: SelectableCollection::new(true),
        }
    }

    /// Populate the filter catalog and assignee candidates, then fetch.
    ///
    /// Catalog failures are logged and leave only the built-in text search.
    pub async fn load(&mut self) -> Result<()> {
        let filters = match self.service.list_filters().await {
            Ok(filters) => filters,
            Err(e) => {
                let e = TrackerError::CatalogUnavailable {
                    catalog: "saved filters",
                    reason: e.to_string(),
                };
                warn!(error = %e, "continuing without saved filters");
                Vec::new()
            }
        };
        self.filters.replace(filter_catalog(filters));

        let mut candidates = vec![AssigneeChoice::Reporter];
        match self.service.current_user().await {
            Ok(me) => candidates.push(AssigneeChoice::User(me)),
            Err(e) => warn!(error = %e, "could not determine current user"),
        }
        match self.service.list_users().await {
            Ok(users) => candidates.extend(users.into_iter().map(AssigneeChoice::User)),
            Err(e) => warn!(error = %e, "could not list known users"),
        }
        self.assignees.add_range(candidates);

        // Nothing remembered: start on the text search filter.
        if self.filters.selected_index().is_none() && !self.filters.is_empty() {
            self.filters.select_index(Some(self.filters.len() - 1));
        }
        self.filters.clear_dirty();
        self.refresh().await
    }

    /// Re-fetch from the server and re-apply the local filters.
    pub async fn refresh(&mut self) -> Result<()> {
        self.fetch().await?;
        self.apply_local_filters().await
    }

    pub fn filters(&self) -> &SelectableCollection<RemoteFilter> {
        &self.filters
    }

    pub fn assignee_filters(&self) -> &SelectableCollection<Facet<User>> {
        &self.assignee_filter
    }

    pub fn status_filters(&self) -> &SelectableCollection<Facet<IssueState>> {
        &self.status_filter
    }

    pub fn text_filter(&self) -> &str {
        &self.text_filter
    }

    /// Users an action may assign issues to.
    pub fn assignees(&self) -> &SelectableCollection<AssigneeChoice> {
        &self.assignees
    }

    /// Issues surviving the current filters, in fetch order.
    pub fn visible(&self) -> &[Issue] {
        self.visible.items()
    }

    /// Everything returned by the last remote fetch.
    pub fn found(&self) -> &[Issue] {
        &self.found
    }

    pub async fn set_remote_filter(&mut self, filter_id: &str) -> Result<()> {
        if !self.filters.contains(filter_id) {
            return Err(TrackerError::FilterNotFound(filter_id.to_string()));
        }
        self.filters.select(filter_id);
        if !self.filters.is_dirty() {
            return Ok(());
        }
        // Stays dirty until the fetch succeeds.
        self.refresh().await?;
        self.filters.clear_dirty();
        Ok(())
    }

    /// Select an assignee facet by id; unknown ids disable the dimension.
    pub async fn set_assignee_filter(&mut self, facet_id: &str) -> Result<()> {
        self.assignee_filter.select(facet_id);
        self.local_filter_changed().await
    }

    /// Select a status facet by id; unknown ids disable the dimension.
    pub async fn set_status_filter(&mut self, facet_id: &str) -> Result<()> {
        self.status_filter.select(facet_id);
        self.local_filter_changed().await
    }

    pub async fn set_text_filter(&mut self, text: &str) -> Result<()> {
        self.text_filter = text.to_string();
        self.local_filter_changed().await
    }

    pub fn is_selected(&self, issue_id: &str) -> bool {
        self.selected.contains(issue_id)
    }

    /// Mark or unmark an issue; only issues from the last fetch can be marked.
    pub fn select_issue(&mut self, issue_id: &str, selected: bool) -> bool {
        if !selected {
            return self.selected.remove(issue_id);
        }
        if !self.found.iter().any(|issue| issue.id == issue_id) {
            return false;
        }
        self.selected.insert(issue_id.to_string())
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Visible issues that are selected, in visible order.
    pub fn selected_issues(&self) -> Vec<Issue> {
        self.visible
            .items()
            .iter()
            .filter(|issue| self.is_selected(&issue.id))
            .cloned()
            .collect()
    }

    /// Selected filter texts as opaque key/value pairs.
    pub fn export_state(&self) -> BTreeMap<String, String> {
        let mut state = BTreeMap::new();
        let entries = [
            (STATE_FILTER_KEY, self.filters.selected_text()),
            (STATE_ASSIGNEE_KEY, self.assignee_filter.selected_text()),
            (STATE_STATUS_KEY, self.status_filter.selected_text()),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                state.insert(key.to_string(), value.to_string());
            }
        }
        state
    }

    /// Restore selections saved by `export_state`; call before `load`.
    pub fn import_state(&mut self, state: &BTreeMap<String, String>) {
        if let Some(text) = state.get(STATE_FILTER_KEY) {
            self.filters.select_text(text);
        }
        if let Some(text) = state.get(STATE_ASSIGNEE_KEY) {
            self.assignee_filter.select_text(text);
        }
        if let Some(text) = state.get(STATE_STATUS_KEY) {
            self.status_filter.select_text(text);
        }
    }

    async fn local_filter_changed(&mut self) -> Result<()> {
        if self.status_filter.is_dirty()
            || self.assignee_filter.is_dirty()
            || self.last_text_filter != self.text_filter
        {
            self.apply_local_filters().await?;
        }
        Ok(())
    }

    async fn apply_local_filters(&mut self) -> Result<()> {
        let text_changed = self.last_text_filter != self.text_filter;
        let text_search = self.filters.selected().is_some_and(|f| f.text_search);
        if text_search && text_changed {
            self.fetch().await?;
        }
        self.status_filter.clear_dirty();
        self.assignee_filter.clear_dirty();
        self.last_text_filter = self.text_filter.clone();

        let assignee = self.assignee_filter.selected();
        let status = self.status_filter.selected();
        let matching: Vec<Issue> = self
            .found
            .iter()
            .filter(|issue| matches_filter(issue, assignee, status, &self.text_filter))
            .cloned()
            .collect();

        debug!(
            found = self.found.len(),
            visible = matching.len(),
            "applied local filters"
        );
        self.visible.replace(matching);
        Ok(())
    }

    async fn fetch(&mut self) -> Result<()> {
        let issues = match self.filters.selected() {
            Some(filter) if filter.id == RemoteFilter::ALL_ISSUES_ID => {
                self.service
                    .text_search(&self.text_filter, 0, self.page_size)
                    .await?
            }
            Some(filter) => {
                let text = filter.text_search.then_some(self.text_filter.as_str());
                self.service
                    .search(&filter.id, text, 0, self.page_size)
                    .await?
            }
            None => Vec::new(),
        };
        debug!(
            filter = self.filters.selected_text().unwrap_or_default(),
            count = issues.len(),
            "fetched issues"
        );

        let mut people: Vec<AssigneeChoice> = Vec::new();
        let mut assigned = vec![Facet::Any];
        let mut statuses = vec![Facet::Any];
        for issue in &issues {
            people.extend(
                [&issue.assignee, &issue.reporter]
                    .into_iter()
                    .flatten()
                    .map(|user| AssigneeChoice::User(user.clone())),
            );
            assigned.push(Facet::of(issue.assignee.as_ref()));
            statuses.push(Facet::of(issue.state.as_ref()));
        }

        self.found = issues;
        self.assignees.add_range(people);
        rebuild_facets(&mut self.assignee_filter, assigned);
        rebuild_facets(&mut self.status_filter, statuses);
        Ok(())
    }
}

/// Saved filters de-duplicated by id and sorted by name, followed by the
/// built-in text search.
pub fn filter_catalog(mut filters: Vec<RemoteFilter>) -> Vec<RemoteFilter> {
    let mut seen = HashSet::new();
    filters.retain(|f| seen.insert(f.id.clone()));
    filters.sort_by_cached_key(|f| f.name.to_lowercase());
    filters.push(RemoteFilter::all_issues());
    filters
}

/// Replace a facet list, falling back to `Any` when the selection vanished.
fn rebuild_facets<T: Faceted>(
    collection: &mut SelectableCollection<Facet<T>>,
    facets: Vec<Facet<T>>,
) {
    let mut seen = HashSet::new();
    let distinct: Vec<Facet<T>> = facets
        .into_iter()
        .filter(|facet| seen.insert(facet.id().to_string()))
        .collect();

    collection.replace(distinct);
    if collection.selected().is_none() {
        collection.select(Facet::<T>::Any.id());
    }
}

/// Whether an issue passes the assignee, status and text filters.
///
/// A missing facet selection disables that dimension. Every whitespace
/// separated token must occur, ignoring case, in at least one of the title,
/// key, description, state, assignee or reporter.
pub fn matches_filter(
    issue: &Issue,
    assignee: Option<&Facet<User>>,
    status: Option<&Facet<IssueState>>,
    text: &str,
) -> bool {
    if !assignee.map_or(true, |facet| facet.matches(issue.assignee.as_ref())) {
        return false;
    }
    if !status.map_or(true, |facet| facet.matches(issue.state.as_ref())) {
        return false;
    }

    let haystacks = [
        issue.title.to_lowercase(),
        issue.key.to_lowercase(),
        issue.description.to_lowercase(),
        issue.state_name().to_lowercase(),
        issue.assignee_name().to_lowercase(),
        issue.reporter_name().to_lowercase(),
    ];
    text.split_whitespace().all(|token| {
        let token = token.to_lowercase();
        haystacks.iter().any(|field| field.contains(&token))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::{issue, user, FakeService};

    fn saved_filter_service() -> FakeService {
        let mut first = issue("ABC-12", "Fix login bug");
        first.description = "Users cannot sign in".to_string();

        let mut second = issue("ABC-13", "Slow dashboard");
        second.assignee = Some(user("carol", "Carol White"));
        second.state = Some(IssueState::new("3", "In Progress"));

        let mut third = issue("ABC-14", "Typo on landing page");
        third.assignee = None;

        let mut service = FakeService {
            filters: vec![
                RemoteFilter::saved("200", "My open issues"),
                RemoteFilter::saved("100", "Backlog"),
                RemoteFilter::saved("200", "My open issues"),
            ],
            users: vec![user("dave", "Dave")],
            ..FakeService::default()
        };
        service
            .filter_results
            .insert("100".to_string(), vec![first.clone(), second.clone(), third]);
        service
            .filter_results
            .insert("200".to_string(), vec![first, second]);
        service
    }

    fn visible_keys<S: IssueService>(pipeline: &FilterPipeline<'_, S>) -> Vec<String> {
        pipeline.visible().iter().map(|i| i.key.clone()).collect()
    }

    #[test]
    fn test_text_tokens_must_all_match() {
        let target = issue("ABC-12", "Fix login bug");
        assert!(matches_filter(&target, None, None, "login ABC-12"));
        assert!(matches_filter(&target, None, None, "  LOGIN\tabc-12 "));
        assert!(!matches_filter(&target, None, None, "login xyz"));
        assert!(matches_filter(&target, None, None, ""));
    }

    #[test]
    fn test_text_matches_people_and_state() {
        let target = issue("ABC-12", "Fix login bug");
        assert!(matches_filter(&target, None, None, "alice"));
        assert!(matches_filter(&target, None, None, "jones"));
        assert!(matches_filter(&target, None, None, "open"));
    }

    #[test]
    fn test_facets_compare_by_id() {
        let target = issue("ABC-12", "Fix login bug");
        let alice = Facet::Value(user("alice", "Someone Else"));
        let carol = Facet::Value(user("carol", "Carol"));
        let open = Facet::Value(IssueState::new("1", "Renamed"));

        assert!(matches_filter(&target, Some(&alice), Some(&open), ""));
        assert!(!matches_filter(&target, Some(&carol), None, ""));
        assert!(matches_filter(&target, Some(&Facet::Any), Some(&Facet::Any), ""));
    }

    #[tokio::test]
    async fn test_load_builds_catalogs() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();

        let filters: Vec<&str> = pipeline
            .filters()
            .items()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(
            filters,
            vec!["Backlog", "My open issues", "All Issues (text search)"]
        );
        assert_eq!(
            pipeline.filters().selected().map(|f| f.id.as_str()),
            Some(RemoteFilter::ALL_ISSUES_ID)
        );
        assert_eq!(service.text_search_calls.borrow().as_slice(), [String::new()]);

        let assignees = pipeline.assignees();
        assert!(assignees.contains("__reporter__"));
        assert!(assignees.contains("me"));
        assert!(assignees.contains("dave"));
    }

    #[tokio::test]
    async fn test_filter_catalog_failure_is_not_fatal() {
        let mut service = saved_filter_service();
        service.fail_filters = true;
        let mut pipeline = FilterPipeline::new(&service);

        pipeline.load().await.unwrap();
        assert_eq!(pipeline.filters().len(), 1);
        assert!(pipeline.filters().items()[0].text_search);
    }

    #[tokio::test]
    async fn test_remote_filter_change_fetches_and_rebuilds_facets() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();

        pipeline.set_remote_filter("100").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13", "ABC-14"]);
        assert_eq!(
            service.search_calls.borrow().as_slice(),
            [("100".to_string(), None::<String>)]
        );

        let assignee_ids: Vec<&str> = pipeline
            .assignee_filters()
            .items()
            .iter()
            .map(Identifiable::id)
            .collect();
        assert_eq!(assignee_ids, vec!["*", "alice", "carol", ""]);
        assert_eq!(pipeline.assignee_filters().selected(), Some(&Facet::Any));
        assert!(pipeline.assignees().contains("carol"));
        assert!(pipeline.assignees().contains("bob"));

        // Selecting the same filter again is not a change.
        pipeline.set_remote_filter("100").await.unwrap();
        assert_eq!(service.search_calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_remote_filter_is_rejected() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();

        let result = pipeline.set_remote_filter("999").await;
        assert!(matches!(result, Err(TrackerError::FilterNotFound(_))));
    }

    #[tokio::test]
    async fn test_local_filters_do_not_fetch() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("100").await.unwrap();
        let calls = service.remote_calls();

        pipeline.set_assignee_filter("carol").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-13"]);

        pipeline.set_assignee_filter("").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-14"]);

        pipeline.set_assignee_filter("*").await.unwrap();
        pipeline.set_status_filter("3").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-13"]);

        pipeline.set_status_filter("*").await.unwrap();
        pipeline.set_text_filter("login").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12"]);

        assert_eq!(service.remote_calls(), calls);
    }

    #[tokio::test]
    async fn test_text_search_filter_refetches_on_text_change() {
        let mut service = saved_filter_service();
        service.text_results = vec![issue("ABC-12", "Fix login bug")];
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        assert_eq!(service.text_search_calls.borrow().len(), 1);

        pipeline.set_text_filter("login").await.unwrap();
        assert_eq!(
            service.text_search_calls.borrow().as_slice(),
            [String::new(), "login".to_string()]
        );
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12"]);

        // Same text again: nothing changed, nothing fetched.
        pipeline.set_text_filter("login").await.unwrap();
        assert_eq!(service.text_search_calls.borrow().len(), 2);

        // Assignee refinement never goes back to the server.
        pipeline.set_assignee_filter("alice").await.unwrap();
        assert_eq!(service.text_search_calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_selection_survives_local_refinement() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("100").await.unwrap();

        assert!(pipeline.select_issue("id-ABC-12", true));
        assert!(pipeline.select_issue("id-ABC-13", true));
        assert!(!pipeline.select_issue("id-NOPE-1", true));

        pipeline.set_assignee_filter("carol").await.unwrap();
        let keys: Vec<String> = pipeline.selected_issues().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["ABC-13"]);
        assert!(pipeline.is_selected("id-ABC-12"));

        pipeline.set_assignee_filter("*").await.unwrap();
        assert_eq!(pipeline.selected_issues().len(), 2);

        pipeline.set_remote_filter("200").await.unwrap();
        assert_eq!(pipeline.selected_issues().len(), 2);

        assert!(pipeline.select_issue("id-ABC-12", false));
        assert_eq!(pipeline.selected_issues().len(), 1);
    }

    #[tokio::test]
    async fn test_facet_selection_resets_when_value_disappears() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("100").await.unwrap();

        pipeline.set_assignee_filter("").await.unwrap();
        assert_eq!(visible_keys(&pipeline), vec!["ABC-14"]);

        // Filter 200 has no unassigned issues.
        pipeline.set_remote_filter("200").await.unwrap();
        assert_eq!(pipeline.assignee_filters().selected(), Some(&Facet::Any));
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13"]);
    }

    #[tokio::test]
    async fn test_disabled_facet_stays_disabled_after_refetch() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("100").await.unwrap();

        pipeline.set_assignee_filter("carol").await.unwrap();
        pipeline.set_assignee_filter("nobody-such").await.unwrap();
        assert!(pipeline.assignee_filters().selected().is_none());
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13", "ABC-14"]);

        pipeline.set_remote_filter("200").await.unwrap();
        assert_eq!(pipeline.assignee_filters().selected(), Some(&Facet::Any));
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13"]);
    }

    #[tokio::test]
    async fn test_failed_filter_switch_is_retried() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("200").await.unwrap();

        service.fail_search.set(true);
        assert!(pipeline.set_remote_filter("100").await.is_err());
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13"]);

        service.fail_search.set(false);
        let calls = service.remote_calls();
        pipeline.set_remote_filter("100").await.unwrap();
        assert!(service.remote_calls() > calls);
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12", "ABC-13", "ABC-14"]);
    }

    #[tokio::test]
    async fn test_failed_text_search_is_retried() {
        let mut service = saved_filter_service();
        service.text_results = vec![issue("ABC-12", "Fix login bug")];
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();

        service.fail_search.set(true);
        assert!(pipeline.set_text_filter("login").await.is_err());

        service.fail_search.set(false);
        pipeline.set_text_filter("login").await.unwrap();
        assert_eq!(
            service.text_search_calls.borrow().as_slice(),
            [String::new(), "login".to_string(), "login".to_string()]
        );
        assert_eq!(visible_keys(&pipeline), vec!["ABC-12"]);
    }

    #[tokio::test]
    async fn test_state_round_trips_through_import() {
        let service = saved_filter_service();
        let mut pipeline = FilterPipeline::new(&service);
        pipeline.load().await.unwrap();
        pipeline.set_remote_filter("100").await.unwrap();
        pipeline.set_status_filter("3").await.unwrap();
        let state = pipeline.export_state();
        assert_eq!(state.get("filter").map(String::as_str), Some("Backlog"));
        assert_eq!(state.get("status").map(String::as_str), Some("In Progress"));

        let mut restored = FilterPipeline::new(&service);
        restored.import_state(&state);
        restored.load().await.unwrap();
        assert_eq!(
            restored.filters().selected().map(|f| f.id.as_str()),
            Some("100")
        );
        assert_eq!(visible_keys(&restored), vec!["ABC-13"]);
    }
}
