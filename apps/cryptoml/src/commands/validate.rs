use std::path::PathBuf;

pub(super) fn run_validate(
    config_path: PathBuf,
    strict: bool,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let config = cryptoml_application::config::load_config(&config_path)?;
    super::common::print_config_summary("validate", &config)?;

    let crate::infra::InputDeps {
        market_data,
        metrics_repo,
    } = crate::infra::build_input_deps();

    let report = cryptoml_application::validation::validate_inputs(
        &config,
        strict,
        market_data.as_ref(),
        metrics_repo.as_ref(),
    )?;

    let pretty = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize report: {}", err))?;
    println!("{}", pretty);
    if let Some(out_path) = out {
        std::fs::write(&out_path, pretty)
            .map_err(|err| format!("failed to write report {}: {}", out_path.display(), err))?;
    }

    Ok(())
}
