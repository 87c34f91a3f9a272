//! Filtered, paginated deployment listing.

use std::collections::BTreeMap;

use convoy_state::{Deployment, DeploymentState};
use serde::Serialize;

use crate::deployment::Deployments;
use crate::error::{RolloutError, RolloutResult};

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 5000;

const ALLOWED_KEYS: &[&str] = &["order_by", "page", "per_page", "app_guids", "states"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    CreatedAt { descending: bool },
    UpdatedAt { descending: bool },
}

impl OrderBy {
    pub fn parse(raw: &str) -> RolloutResult<Self> {
        let (descending, column) = match raw.strip_prefix('-') {
            Some(column) => (true, column),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        match column {
            "created_at" => Ok(OrderBy::CreatedAt { descending }),
            "updated_at" => Ok(OrderBy::UpdatedAt { descending }),
            _ => Err(RolloutError::validation(
                "order_by",
                format!("can only be 'created_at' or 'updated_at', got {raw:?}"),
            )),
        }
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        OrderBy::CreatedAt { descending: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentListQuery {
    pub app_ids: Option<Vec<String>>,
    pub states: Option<Vec<DeploymentState>>,
    pub page: u32,
    pub per_page: u32,
    pub order_by: OrderBy,
}

impl Default for DeploymentListQuery {
    fn default() -> Self {
        Self {
            app_ids: None,
            states: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            order_by: OrderBy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPage {
    pub deployments: Vec<Deployment>,
    pub total_results: usize,
    pub page: u32,
    pub per_page: u32,
}

impl DeploymentListQuery {
    /// Build a query from raw request parameters.
    ///
    /// `app_guids` and `states` are comma-separated lists. Unknown keys are
    /// rejected.
    pub fn from_params(params: &BTreeMap<String, String>) -> RolloutResult<Self> {
        if let Some(unknown) = params.keys().find(|k| !ALLOWED_KEYS.contains(&k.as_str())) {
            return Err(RolloutError::validation(
                "params",
                format!("unknown query parameter(s): '{unknown}'"),
            ));
        }

        let mut query = DeploymentListQuery::default();
        if let Some(raw) = params.get("app_guids") {
            query.app_ids = Some(split_list(raw));
        }
        if let Some(raw) = params.get("states") {
            query.states = Some(split_list(raw).into_iter().map(DeploymentState::from).collect());
        }
        if let Some(raw) = params.get("page") {
            query.page = parse_number("page", raw)?;
        }
        if let Some(raw) = params.get("per_page") {
            query.per_page = parse_number("per_page", raw)?;
        }
        if let Some(raw) = params.get("order_by") {
            query.order_by = OrderBy::parse(raw)?;
        }
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> RolloutResult<()> {
        if self.page < 1 {
            return Err(RolloutError::validation("page", "must be greater than 0"));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(RolloutError::validation(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        Ok(())
    }

    fn matches(&self, deployment: &Deployment) -> bool {
        let app_ok = self
            .app_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&deployment.app_id));
        let state_ok = self
            .states
            .as_ref()
            .is_none_or(|states| states.contains(&deployment.state));
        app_ok && state_ok
    }
}

impl Deployments {
    /// One page of deployments matching `query`.
    pub fn list(&self, query: &DeploymentListQuery) -> RolloutResult<DeploymentPage> {
        query.validate()?;

        let mut matching: Vec<Deployment> = self
            .store()
            .list_deployments()?
            .into_iter()
            .filter(|d| query.matches(d))
            .collect();

        match query.order_by {
            OrderBy::CreatedAt { descending } => {
                matching.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
                if descending {
                    matching.reverse();
                }
            }
            OrderBy::UpdatedAt { descending } => {
                matching.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id)));
                if descending {
                    matching.reverse();
                }
            }
        }

        let total_results = matching.len();
        let skip = (query.page as usize - 1) * query.per_page as usize;
        let deployments = matching
            .into_iter()
            .skip(skip)
            .take(query.per_page as usize)
            .collect();

        Ok(DeploymentPage {
            deployments,
            total_results,
            page: query.page,
            per_page: query.per_page,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(field: &'static str, raw: &str) -> RolloutResult<u32> {
    raw.parse()
        .map_err(|_| RolloutError::validation(field, format!("must be an integer, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::NewDeployment;
    use convoy_state::StateStore;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn seeded() -> Deployments {
        let repo = Deployments::new(StateStore::open_in_memory().unwrap());
        for (id, app) in [("d1", "app-a"), ("d2", "app-a"), ("d3", "app-b")] {
            repo.create(NewDeployment {
                id: id.to_string(),
                app_id: app.to_string(),
                droplet_id: "droplet".to_string(),
                deploying_web_process_id: None,
            })
            .unwrap();
        }
        repo.set_state("d2", DeploymentState::Deployed).unwrap();
        repo
    }

    fn ids(page: &DeploymentPage) -> Vec<&str> {
        page.deployments.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn from_params_splits_lists() {
        let query = DeploymentListQuery::from_params(&params(&[
            ("app_guids", "app-a, app-b"),
            ("states", "DEPLOYING,CANCELED"),
            ("per_page", "10"),
            ("order_by", "-updated_at"),
        ]))
        .unwrap();

        assert_eq!(query.app_ids, Some(vec!["app-a".to_string(), "app-b".to_string()]));
        assert_eq!(
            query.states,
            Some(vec![DeploymentState::Deploying, DeploymentState::Canceled])
        );
        assert_eq!(query.per_page, 10);
        assert_eq!(query.order_by, OrderBy::UpdatedAt { descending: true });
    }

    #[test]
    fn from_params_rejects_unknown_keys() {
        let err = DeploymentListQuery::from_params(&params(&[("foo", "bar")])).unwrap_err();
        assert!(matches!(err, RolloutError::Validation { field: "params", .. }));
    }

    #[test]
    fn from_params_rejects_bad_paging() {
        for bad in [("page", "0"), ("per_page", "5001"), ("per_page", "ten"), ("order_by", "name")] {
            assert!(
                DeploymentListQuery::from_params(&params(&[bad])).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn filters_by_app_and_state() {
        let repo = seeded();

        let query = DeploymentListQuery {
            app_ids: Some(vec!["app-a".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&repo.list(&query).unwrap()), vec!["d1", "d2"]);

        let query = DeploymentListQuery {
            states: Some(vec![DeploymentState::Deploying]),
            ..Default::default()
        };
        assert_eq!(ids(&repo.list(&query).unwrap()), vec!["d1", "d3"]);
    }

    #[test]
    fn paginates_and_counts() {
        let repo = seeded();
        let query = DeploymentListQuery {
            page: 2,
            per_page: 2,
            ..Default::default()
        };
        let page = repo.list(&query).unwrap();
        assert_eq!(page.total_results, 3);
        assert_eq!(ids(&page), vec!["d3"]);
    }

    #[test]
    fn descending_order() {
        let repo = seeded();
        let query = DeploymentListQuery {
            order_by: OrderBy::CreatedAt { descending: true },
            ..Default::default()
        };
        assert_eq!(ids(&repo.list(&query).unwrap()), vec!["d3", "d2", "d1"]);
    }
}
