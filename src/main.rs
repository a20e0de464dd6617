use anyhow::Result;
use baf2mzml::{BafSource, InMemoryStorage};

// Sandbox driver: prints a summary of one acquisition's metadata store.
// The real driver (GUI or CLI) is an external collaborator and supplies
// an ArrayStorage bound to the vendor library; with the in-memory
// storage used here only the metadata side can be demonstrated.
fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: baf2mzml_sandbox <metadata-store.sqlite>");
        std::process::exit(2)
    };

    let source = BafSource::open(&path, InMemoryStorage::new())?;

    println!("=== {} ===", path);
    println!("Spectra: {}", source.scan_count()?);

    let keys = source.acquisition_keys()?;
    println!("Acquisition keys: {}", keys.len());
    for key in keys.values() {
        println!(
            "  key {}: polarity={:?} scan_mode={} ms_level={}",
            key.id, key.polarity, key.scan_mode, key.ms_level
        );
    }

    let variables = source.supported_variables()?;
    println!("Supported variables: {}", variables.len());

    let acquisition_data = source.spectra_acquisition_data()?;
    let with_isolation = acquisition_data
        .values()
        .filter(|d| d.msms_isolation_mz.is_some())
        .count();
    println!(
        "Scans with acquisition variables: {} ({} with isolation m/z)",
        acquisition_data.len(),
        with_isolation
    );

    source.close()?;
    Ok(())
}
