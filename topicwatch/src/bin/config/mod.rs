mod ingester;

pub use ingester::IngesterConfig;
