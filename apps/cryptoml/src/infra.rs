use cryptoml_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use cryptoml_domain::repositories::market_data::{MarketDataRepository, MetricsRepository};
use cryptoml_infrastructure::artifacts::{FilesystemArtifactReader, FilesystemArtifactWriter};
use cryptoml_infrastructure::market_data::{CsvMarketDataRepository, CsvMetricsRepository};

pub struct InputDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub metrics_repo: Box<dyn MetricsRepository>,
}

pub struct ArtifactDeps {
    pub reader: Box<dyn ArtifactReader>,
    pub writer: Box<dyn ArtifactWriter>,
}

pub fn build_input_deps() -> InputDeps {
    InputDeps {
        market_data: Box::new(CsvMarketDataRepository::new()),
        metrics_repo: Box::new(CsvMetricsRepository::new()),
    }
}

pub fn build_artifact_deps() -> ArtifactDeps {
    ArtifactDeps {
        reader: Box::new(FilesystemArtifactReader::new()),
        writer: Box::new(FilesystemArtifactWriter::new()),
    }
}
