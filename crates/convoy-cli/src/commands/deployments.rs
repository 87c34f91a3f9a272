use anyhow::bail;
use convoy_rollout::{DeploymentHistory, DeploymentListQuery, Deployments, OrderBy};
use convoy_state::DeploymentState;

use super::Context;

pub struct ListArgs {
    pub app_guids: Vec<String>,
    pub states: Vec<String>,
    pub page: u32,
    pub per_page: u32,
    pub order_by: String,
}

impl ListArgs {
    fn query(self) -> anyhow::Result<DeploymentListQuery> {
        let query = DeploymentListQuery {
            app_ids: non_empty(self.app_guids),
            states: non_empty(self.states)
                .map(|states| states.into_iter().map(DeploymentState::from).collect()),
            page: self.page,
            per_page: self.per_page,
            order_by: OrderBy::parse(&self.order_by)?,
        };
        query.validate()?;
        Ok(query)
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

pub fn list(ctx: &Context, args: ListArgs, format: &str) -> anyhow::Result<()> {
    let query = args.query()?;
    let page = Deployments::new(ctx.open_store()?).list(&query)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        _ => {
            for d in &page.deployments {
                println!("{}  {:<10}  app={}  droplet={}", d.id, d.state, d.app_id, d.droplet_id);
            }
            println!(
                "page {} ({} per page), {} total",
                page.page, page.per_page, page.total_results
            );
        }
    }
    Ok(())
}

pub fn history(ctx: &Context, deployment_id: &str) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    if Deployments::new(store.clone()).get(deployment_id)?.is_none() {
        bail!("deployment {deployment_id} not found");
    }

    let history = DeploymentHistory::new(store);
    for participant in history.historical_participants(deployment_id)? {
        let status = match history.live_process(&participant)? {
            Some(process) => format!("{:?}", process.state).to_lowercase(),
            None => "deleted".to_string(),
        };
        println!(
            "{}  {}  {}",
            participant.process_id, participant.process_type, status
        );
    }
    Ok(())
}

pub fn destroy(ctx: &Context, deployment_id: &str) -> anyhow::Result<()> {
    match Deployments::new(ctx.open_store()?).destroy(deployment_id)? {
        Some(entries) => {
            println!("✓ Destroyed {deployment_id} ({entries} history entries)");
            Ok(())
        }
        None => bail!("deployment {deployment_id} not found"),
    }
}
