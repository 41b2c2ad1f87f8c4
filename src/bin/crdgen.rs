//! Print every CustomResourceDefinition as a multi-document YAML stream
//!
//! `cargo run --bin crdgen > crds.yaml`

use gardener_api::all_crds;
use gardener_api::install::render_crds_yaml;

fn main() -> gardener_api::Result<()> {
    print!("{}", render_crds_yaml(&all_crds()?)?);
    Ok(())
}
