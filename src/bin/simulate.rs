use std::{collections::BTreeSet, path::PathBuf, process};

use anyhow::{anyhow, bail, Context};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use secagg_client::{
    client::SecAggClient,
    common::SessionConfig,
    mask::{dequantize_sum, Aggregation, SelfSeed, ELEMENT_BYTES},
    settings::Settings,
    sharing::{FromBytes, ShareBundle},
    EncryptedShares,
    ParticipantIndex,
    PeerPublicKeys,
    RevealedShares,
};
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, StructOpt)]
#[structopt(name = "SecAgg simulation")]
/// Simulates one round of secure aggregation with all participants of the configured session.
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,

    /// Indices of the participants which drop out after the shares are exchanged
    #[structopt(short, long)]
    dropped: Vec<ParticipantIndex>,

    /// Number of weights of the model updates
    #[structopt(short, long, default_value = "16")]
    length: usize,
}

fn main() {
    let opt = Opt::from_args();

    let settings = Settings::new(&opt.config_path).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let config = settings.session_config();

    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(settings.log.filter)
        .with_ansi(true)
        .init();

    if let Err(err) = simulate(config, &opt.dropped, opt.length) {
        eprintln!("simulation failed: {:?}", err);
        process::exit(1);
    }
}

fn simulate(
    template: SessionConfig,
    dropped: &[ParticipantIndex],
    length: usize,
) -> anyhow::Result<()> {
    let dropped = dropped.iter().copied().collect::<BTreeSet<_>>();
    if let Some(index) = dropped.iter().find(|index| !template.contains(**index)) {
        bail!("participant {} is not part of the round", index);
    }
    let survivors = template.total_clients as usize - dropped.len();
    if survivors < template.threshold as usize {
        bail!(
            "{} surviving participants cannot meet the threshold of {}",
            survivors,
            template.threshold
        );
    }

    let mut clients = (1..=template.total_clients)
        .map(|index| {
            let config = SessionConfig {
                client_index: index,
                ..template.clone()
            };
            SecAggClient::new(config)
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "created {} clients with threshold {}",
        clients.len(),
        template.threshold
    );

    // setup
    let keys = clients
        .iter()
        .map(|client| (client.config().client_index, client.public_key()))
        .collect::<PeerPublicKeys>();
    for client in clients.iter_mut() {
        client.receive_peer_public_keys(&keys)?;
    }

    // share keys
    let outgoing = clients
        .iter_mut()
        .map(|client| Ok((client.config().client_index, client.generate_encrypted_shares()?)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    for client in clients.iter_mut() {
        let recipient = client.config().client_index;
        let incoming = outgoing
            .iter()
            .filter_map(|(sender, shares)| {
                shares
                    .get(&recipient)
                    .map(|share| (*sender, share.clone()))
            })
            .collect::<EncryptedShares>();
        client.receive_encrypted_shares(&incoming)?;
    }

    clients.retain(|client| !dropped.contains(&client.config().client_index));
    if !dropped.is_empty() {
        warn!("participants {:?} dropped out", dropped);
    }

    // collect masked vectors
    let mut prng = ChaCha20Rng::from_entropy();
    let clipping_range = template.clipping_range;
    let mut expected = vec![0_f64; length];
    let mut aggregation = Aggregation::new(template.mod_range, length * ELEMENT_BYTES)?;
    for client in clients.iter_mut() {
        let update = (0..length)
            .map(|_| (prng.gen::<f64>() * 2. - 1.) * clipping_range)
            .collect::<Vec<_>>();
        for (sum, weight) in expected.iter_mut().zip(&update) {
            *sum += weight;
        }
        let masked = client.mask_quantized(&update)?;
        aggregation.aggregate(&masked)?;
    }
    info!("aggregated {} masked updates", aggregation.nb_vectors());

    // unmask
    if dropped.is_empty() {
        let everyone = (1..=template.total_clients).collect::<Vec<_>>();
        let revealed = clients
            .iter_mut()
            .map(|client| client.reveal_shares_for_dropped(&everyone))
            .collect::<Result<Vec<_>, _>>()?;
        for index in everyone {
            aggregation.remove_self_mask(&recover_seed(&revealed, index)?)?;
        }
        verify_sum(&template, &aggregation, &expected)
    } else {
        let dropped = dropped.into_iter().collect::<Vec<_>>();
        let revealed = clients
            .iter_mut()
            .map(|client| client.reveal_shares_for_dropped(&dropped))
            .collect::<Result<Vec<_>, _>>()?;
        for index in dropped {
            recover_seed(&revealed, index)?;
            info!("recovered the self seed of participant {}", index);
        }
        Ok(())
    }
}

fn recover_seed(revealed: &[RevealedShares], index: ParticipantIndex) -> anyhow::Result<SelfSeed> {
    let bundles = revealed
        .iter()
        .filter_map(|shares| shares.get(&index))
        .map(|bytes| ShareBundle::from_byte_slice(bytes))
        .collect::<anyhow::Result<Vec<_>>>()
        .with_context(|| format!("invalid share of participant {}", index))?;
    SelfSeed::from_bundles(&bundles)
        .with_context(|| format!("failed to recover the seed of participant {}", index))
}

/// Checks that the unmasked aggregate matches the float sum up to the quantization error.
fn verify_sum(
    config: &SessionConfig,
    aggregation: &Aggregation,
    expected: &[f64],
) -> anyhow::Result<()> {
    let count = aggregation.nb_vectors();
    if count as u64 * u64::from(config.target_range) >= config.mod_range {
        warn!("the quantized sum may wrap around the mask range");
    }

    let sum = dequantize_sum(
        aggregation.elements(),
        config.clipping_range,
        config.target_range,
        count,
    );
    let bound = count as f64 * 2. * config.clipping_range / f64::from(config.target_range);
    let deviation = sum
        .iter()
        .zip(expected)
        .map(|(actual, expected)| (actual - expected).abs())
        .fold(0_f64, f64::max);
    info!(
        "max deviation of the aggregate from the float sum: {} (bound {})",
        deviation, bound
    );
    if deviation > bound {
        return Err(anyhow!(
            "the aggregate deviates by {} from the float sum",
            deviation
        ));
    }
    Ok(())
}
