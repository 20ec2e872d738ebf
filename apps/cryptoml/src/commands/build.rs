use std::path::PathBuf;

pub(super) fn run_build(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let mut config = cryptoml_application::config::load_config(&config_path)?;
    if let Some(out) = out {
        config.paths.out_dir = out.display().to_string();
    }
    super::common::print_config_summary("build", &config)?;

    let crate::infra::InputDeps {
        market_data,
        metrics_repo,
    } = crate::infra::build_input_deps();
    let crate::infra::ArtifactDeps { writer, .. } = crate::infra::build_artifact_deps();

    let outcome = cryptoml_application::building::build_dataset(
        &config,
        market_data.as_ref(),
        metrics_repo.as_ref(),
        writer.as_ref(),
    )?;

    println!(
        "dataset: records={} features={} valid={}..{} sha256={}",
        outcome.info.records,
        outcome.info.features_count,
        outcome.info.valid_index_min,
        outcome.info.valid_index_max,
        outcome.info.config_sha256
    );
    println!("features csv: {}", outcome.paths.features.display());
    println!("metadata csv: {}", outcome.paths.metadata.display());
    println!("targets csv: {}", outcome.paths.targets.display());
    println!("info json: {}", outcome.paths.info.display());
    Ok(())
}
