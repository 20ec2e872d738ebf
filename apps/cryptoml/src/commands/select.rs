use cryptoml_application::selection::{apply_feature_selection, dataset_training_window};
use cryptoml_application::{resolve_train_fraction, ArtifactPaths};
use cryptoml_infrastructure::reporting::read_support_csv;
use std::path::PathBuf;

pub(super) fn run_select(
    config_path: PathBuf,
    support_path: PathBuf,
    fraction: Option<f64>,
) -> Result<(), String> {
    let mut config = cryptoml_application::config::load_config(&config_path)?;
    if let Some(fraction) = fraction {
        config.selection.get_or_insert_with(Default::default).train_fraction = Some(fraction);
    }
    super::common::print_config_summary("select", &config)?;

    let fraction = resolve_train_fraction(&config)?;
    let paths = ArtifactPaths::from_config(&config);
    let crate::infra::ArtifactDeps { reader, writer } = crate::infra::build_artifact_deps();

    let window = dataset_training_window(&paths, fraction, reader.as_ref())?;
    println!(
        "training window: rows {}..{} of valid {}..{} (train_rows={}, fraction={})",
        window.first,
        window.first + window.train_rows,
        window.first,
        window.last,
        window.train_rows,
        fraction
    );

    let support = read_support_csv(&support_path)?;
    let outcome = apply_feature_selection(&paths.info, &support, reader.as_ref(), writer.as_ref())?;
    println!(
        "selection: enabled={} disabled={} changed={} backup={}",
        outcome.enabled,
        outcome.disabled,
        outcome.changed,
        outcome.backup_path.display()
    );
    Ok(())
}
