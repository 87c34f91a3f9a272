use convoy_core::{BuildpackLifecycleData, LifecycleSummary};

pub struct LifecycleArgs {
    pub app_guid: Option<String>,
    pub build_guid: Option<String>,
    pub droplet_guid: Option<String>,
    pub buildpack: Option<String>,
    pub stack: Option<String>,
}

/// Validate buildpack lifecycle data and print its summary with
/// credentials masked.
pub fn show(args: LifecycleArgs) -> anyhow::Result<()> {
    let summary = summarize(args)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn summarize(args: LifecycleArgs) -> anyhow::Result<LifecycleSummary> {
    let mut data = BuildpackLifecycleData {
        app_id: args.app_guid,
        build_id: args.build_guid,
        droplet_id: args.droplet_guid,
        stack: args.stack,
        ..Default::default()
    };
    data.set_buildpack_identifier(args.buildpack.as_deref());
    data.validate()?;
    Ok(data.summary())
}
