//! Verify-included command implementation.

use super::{print_json, CliResult, RemoteArgs};
use merklelog_core::massif::massif_index_of;
use merklelog_core::mmr::NodeSource;
use merklelog_core::seal::parse_public_key;
use merklelog_core::verify::{prove_inclusion, verify_inclusion, verify_massif};
use merklelog_core::{Ed25519SealVerifier, MassifReader, TrustedSealer};
use serde::Serialize;

/// Inclusion check output.
#[derive(Debug, Serialize)]
pub struct InclusionOutput {
    /// Tenant identity.
    pub tenant: String,
    /// Proven node.
    pub mmr_index: u64,
    /// Massif holding the node.
    pub massif_index: u32,
    /// Sealed MMR size the proof is against.
    pub mmr_size: u64,
    /// Node value, hex.
    pub node: String,
    /// Proof path, hex.
    pub proof: Vec<String>,
    /// Whether the proof verified against the sealed peaks.
    pub verified: bool,
}

/// Runs `verify-included`.
pub fn run(
    remote: &RemoteArgs,
    tenant: &str,
    mmr_index: u64,
    sealer_key: Option<&str>,
    format: &str,
) -> CliResult<()> {
    let key = sealer_key.map(parse_public_key).transpose()?;
    let sealer = key.as_ref().map(|key| TrustedSealer {
        verifier: &Ed25519SealVerifier,
        key: key.as_slice(),
    });

    let reader = remote.open_reader()?;
    let massif_index = massif_index_of(remote.height, mmr_index);
    let massif = reader.get_massif(tenant, massif_index)?;
    let seal = reader.get_checkpoint(tenant, massif_index)?;
    let state = verify_massif(&massif, &seal, None, sealer)?;
    if mmr_index >= state.mmr_size {
        return Err(format!(
            "mmr index {mmr_index} is not covered by the seal (sealed size {})",
            state.mmr_size
        )
        .into());
    }

    let node = massif.node(mmr_index)?;
    let proof = prove_inclusion(&massif, state.mmr_size, mmr_index)?;
    let verified = verify_inclusion(state.mmr_size, &node, mmr_index, &proof, &state.peaks);

    let output = InclusionOutput {
        tenant: tenant.to_string(),
        mmr_index,
        massif_index,
        mmr_size: state.mmr_size,
        node: hex::encode(node),
        proof: proof.iter().map(hex::encode).collect(),
        verified,
    };
    match format {
        "json" => print_json(&output)?,
        _ => {
            println!("Tenant: {}", output.tenant);
            println!("MMR index {} in massif {}", output.mmr_index, output.massif_index);
            println!("Sealed size: {}", output.mmr_size);
            println!("Node: {}", output.node);
            for (i, step) in output.proof.iter().enumerate() {
                println!("  proof[{i}]: {step}");
            }
            println!("Verified: {}", output.verified);
        }
    }

    if verified {
        Ok(())
    } else {
        Err(format!("inclusion proof for mmr index {mmr_index} did not verify").into())
    }
}
