use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{
    client::{ClientError, SecAggClient, Stage},
    common::{InvalidConfigError, SessionConfig},
    crypto::{ByteObject, ExchangeKeyPair, PublicExchangeKey},
    mask::{dequantize_sum, encode_elements, pairwise_mask, Aggregation, SelfSeed},
    sharing::{FromBytes, ShareBundle},
    EncryptedShares,
    ParticipantIndex,
    PeerPublicKeys,
    RevealedShares,
};

fn setup(threshold: u32, total: u32) -> Vec<SecAggClient> {
    (1..=total)
        .map(|index| {
            SecAggClient::new(SessionConfig::new("session", 1, threshold, total, index)).unwrap()
        })
        .collect()
}

fn public_keys(clients: &[SecAggClient]) -> PeerPublicKeys {
    clients
        .iter()
        .map(|client| (client.config().client_index, client.public_key()))
        .collect()
}

fn share_keys(clients: &mut [SecAggClient]) {
    let keys = public_keys(clients);
    for client in clients.iter_mut() {
        client.receive_peer_public_keys(&keys).unwrap();
    }
}

fn generate_shares(clients: &mut [SecAggClient]) -> Vec<(ParticipantIndex, EncryptedShares)> {
    clients
        .iter_mut()
        .map(|client| {
            (
                client.config().client_index,
                client.generate_encrypted_shares().unwrap(),
            )
        })
        .collect()
}

/// Collects the shares addressed to the `recipient`, keyed by sender.
fn shares_for(
    outgoing: &[(ParticipantIndex, EncryptedShares)],
    recipient: ParticipantIndex,
) -> EncryptedShares {
    outgoing
        .iter()
        .filter_map(|(sender, shares)| {
            shares
                .get(&recipient)
                .map(|share| (*sender, share.clone()))
        })
        .collect()
}

fn exchange_shares(clients: &mut [SecAggClient]) {
    let outgoing = generate_shares(clients);
    for client in clients.iter_mut() {
        let shares = shares_for(&outgoing, client.config().client_index);
        client.receive_encrypted_shares(&shares).unwrap();
    }
}

fn recover_seed(revealed: &[RevealedShares], index: ParticipantIndex) -> SelfSeed {
    let bundles = revealed
        .iter()
        .filter_map(|shares| shares.get(&index))
        .map(|bytes| ShareBundle::from_byte_slice(bytes).unwrap())
        .collect::<Vec<_>>();
    SelfSeed::from_bundles(&bundles).unwrap()
}

#[test]
fn test_new() {
    let client = SecAggClient::new(SessionConfig::new("session", 1, 2, 3, 2)).unwrap();
    assert_eq!(client.stage(), Stage::Setup);
    assert_eq!(client.config().client_index, 2);
    assert!(client.self_seed().is_some());

    let other = SecAggClient::new(SessionConfig::new("session", 1, 2, 3, 3)).unwrap();
    assert_ne!(client.public_key(), other.public_key());
    assert_ne!(client.self_seed(), other.self_seed());
}

#[test]
fn test_invalid_config() {
    assert!(matches!(
        SecAggClient::new(SessionConfig::new("session", 1, 4, 3, 1)),
        Err(ClientError::InvalidConfig(InvalidConfigError::Threshold { .. }))
    ));
    assert!(matches!(
        SecAggClient::new(SessionConfig::new("session", 1, 2, 3, 0)),
        Err(ClientError::InvalidConfig(InvalidConfigError::ClientIndex { .. }))
    ));
}

#[test]
fn test_stage_ordering() {
    let mut clients = setup(2, 3);

    assert!(matches!(
        clients[0].generate_encrypted_shares(),
        Err(ClientError::ProtocolState {
            expected: Stage::ShareKeys,
            actual: Stage::Setup,
        })
    ));
    assert!(matches!(
        clients[0].mask_model_update(&[0; 8]),
        Err(ClientError::ProtocolState {
            expected: Stage::CollectMaskedVectors,
            actual: Stage::Setup,
        })
    ));
    assert!(matches!(
        clients[0].complete(),
        Err(ClientError::ProtocolState {
            expected: Stage::Unmask,
            ..
        })
    ));
    assert!(matches!(
        clients[0].own_share(2),
        Err(ClientError::ProtocolState {
            expected: Stage::ShareKeys,
            actual: Stage::Setup,
        })
    ));
    assert_eq!(clients[0].stage(), Stage::Setup);

    share_keys(&mut clients);
    assert_eq!(clients[0].stage(), Stage::ShareKeys);
    assert!(matches!(
        clients[0].receive_peer_public_keys(&PeerPublicKeys::new()),
        Err(ClientError::ProtocolState {
            expected: Stage::Setup,
            actual: Stage::ShareKeys,
        })
    ));

    // the own shares are required before the shares of the peers are accepted
    assert!(matches!(
        clients[0].receive_encrypted_shares(&EncryptedShares::new()),
        Err(ClientError::SharesNotGenerated)
    ));
    assert!(matches!(
        clients[0].own_share(2),
        Err(ClientError::SharesNotGenerated)
    ));
    assert_eq!(clients[0].stage(), Stage::ShareKeys);

    let shares = clients[0].generate_encrypted_shares().unwrap();
    assert_eq!(shares.len(), 2);
    assert_eq!(clients[0].stage(), Stage::ShareKeys);
    clients[0]
        .receive_encrypted_shares(&EncryptedShares::new())
        .unwrap();
    assert_eq!(clients[0].stage(), Stage::CollectMaskedVectors);

    clients[0].mask_model_update(&[0; 8]).unwrap();
    assert_eq!(clients[0].stage(), Stage::Unmask);
    assert!(matches!(
        clients[0].mask_model_update(&[0; 8]),
        Err(ClientError::ProtocolState {
            expected: Stage::CollectMaskedVectors,
            actual: Stage::Unmask,
        })
    ));

    clients[0].complete().unwrap();
    assert_eq!(clients[0].stage(), Stage::Completed);
}

#[test]
fn test_completed_is_terminal() {
    let mut clients = setup(2, 2);
    share_keys(&mut clients);
    exchange_shares(&mut clients);
    clients[0].mask_model_update(&[1; 4]).unwrap();
    let revealed = clients[0].reveal_shares_for_dropped(&[2]).unwrap();
    assert_eq!(revealed.len(), 1);

    let client = &mut clients[0];
    assert_eq!(client.stage(), Stage::Completed);
    assert!(client.self_seed().is_none());
    assert!(client.shared_secret(2).is_none());
    assert!(matches!(
        client.receive_peer_public_keys(&PeerPublicKeys::new()),
        Err(ClientError::ProtocolState {
            actual: Stage::Completed,
            ..
        })
    ));
    assert!(client.generate_encrypted_shares().is_err());
    assert!(client.mask_model_update(&[1; 4]).is_err());
    assert!(client.reveal_shares_for_dropped(&[2]).is_err());
    assert!(client.complete().is_err());
    assert!(matches!(
        client.own_share(2),
        Err(ClientError::ProtocolState {
            expected: Stage::ShareKeys,
            actual: Stage::Completed,
        })
    ));
}

#[test]
fn test_receive_peer_public_keys() {
    let mut client = SecAggClient::new(SessionConfig::new("session", 1, 2, 3, 1)).unwrap();
    let mut keys = PeerPublicKeys::new();
    keys.insert(1, client.public_key());
    keys.insert(2, ExchangeKeyPair::generate().public);
    // a low order point
    keys.insert(3, PublicExchangeKey::zeroed());
    // not a participant of the round
    keys.insert(7, ExchangeKeyPair::generate().public);
    client.receive_peer_public_keys(&keys).unwrap();

    assert!(client.shared_secret(1).is_none());
    assert!(client.shared_secret(2).is_some());
    assert!(client.shared_secret(3).is_none());
    assert!(client.shared_secret(7).is_none());

    // only peers with a shared secret receive shares
    let shares = client.generate_encrypted_shares().unwrap();
    assert_eq!(shares.keys().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_pairwise_masks_cancel() {
    let mut clients = setup(2, 2);
    share_keys(&mut clients);

    let context = clients[0].config().context();
    let secret_1 = clients[0].shared_secret(2).unwrap();
    let secret_2 = clients[1].shared_secret(1).unwrap();
    assert_eq!(secret_1, secret_2);
    assert_eq!(
        pairwise_mask(secret_1, &context, 1 << 32, 4),
        pairwise_mask(secret_2, &context, 1 << 32, 4),
    );

    exchange_shares(&mut clients);
    let seeds = clients
        .iter()
        .map(|client| client.self_seed().unwrap().clone())
        .collect::<Vec<_>>();

    let mut aggregation = Aggregation::new(1 << 32, 16).unwrap();
    for client in clients.iter_mut() {
        let masked = client.mask_model_update(&[0; 16]).unwrap();
        assert_ne!(masked, vec![0; 16]);
        aggregation.aggregate(&masked).unwrap();
    }
    for seed in &seeds {
        aggregation.remove_self_mask(seed).unwrap();
    }
    assert_eq!(aggregation.into_bytes(), vec![0; 16]);
}

#[test]
fn test_higher_index_adds_pairwise_mask() {
    let mut clients = setup(2, 2);
    share_keys(&mut clients);
    exchange_shares(&mut clients);

    let context = clients[0].config().context();
    let pairwise = pairwise_mask(clients[0].shared_secret(2).unwrap(), &context, 1 << 32, 4);
    let self_masks = clients
        .iter()
        .map(|client| client.self_seed().unwrap().derive_mask(4, 1 << 32))
        .collect::<Vec<_>>();

    // modulo 2^32 the client with the higher index adds the pairwise mask, the other subtracts it
    let expected_1 = (0..4)
        .map(|k| self_masks[0][k].wrapping_sub(pairwise[k]))
        .collect::<Vec<_>>();
    let expected_2 = (0..4)
        .map(|k| self_masks[1][k].wrapping_add(pairwise[k]))
        .collect::<Vec<_>>();
    assert_eq!(
        clients[0].mask_model_update(&[0; 16]).unwrap(),
        encode_elements(&expected_1, 16)
    );
    assert_eq!(
        clients[1].mask_model_update(&[0; 16]).unwrap(),
        encode_elements(&expected_2, 16)
    );
}

#[test]
fn test_full_round() {
    let mut clients = setup(3, 4);
    share_keys(&mut clients);
    exchange_shares(&mut clients);

    let mut prng = ChaCha20Rng::from_seed([1; 32]);
    let updates = (0..4)
        .map(|_| (0..8).map(|_| prng.gen::<u32>()).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut aggregation = Aggregation::new(1 << 32, 32).unwrap();
    for (client, update) in clients.iter_mut().zip(&updates) {
        let raw = encode_elements(update, 32);
        let masked = client.mask_model_update(&raw).unwrap();
        assert_eq!(masked.len(), raw.len());
        assert_ne!(masked, raw);
        aggregation.aggregate(&masked).unwrap();
    }

    // without dropouts, the shares of every seed are revealed to remove the self masks
    let everyone = (1..=4).collect::<Vec<_>>();
    let revealed = clients
        .iter_mut()
        .map(|client| client.reveal_shares_for_dropped(&everyone).unwrap())
        .collect::<Vec<_>>();
    for index in everyone {
        aggregation
            .remove_self_mask(&recover_seed(&revealed, index))
            .unwrap();
    }

    let expected = (0..8)
        .map(|k| {
            updates
                .iter()
                .fold(0_u32, |sum, update| sum.wrapping_add(update[k]))
        })
        .collect::<Vec<_>>();
    assert_eq!(aggregation.elements(), expected.as_slice());
}

#[test]
fn test_dropout_recovery() {
    let mut clients = setup(3, 5);
    share_keys(&mut clients);
    exchange_shares(&mut clients);

    // client 3 drops after the shares are exchanged
    let dropped = clients.remove(2);
    let seed = dropped.self_seed().unwrap().clone();

    let bundles = clients
        .iter_mut()
        .map(|client| {
            client.mask_model_update(&[0; 16]).unwrap();
            let mut revealed = client.reveal_shares_for_dropped(&[3]).unwrap();
            ShareBundle::from_byte_slice(&revealed.remove(&3).unwrap()).unwrap()
        })
        .collect::<Vec<_>>();
    assert_eq!(bundles.len(), 4);

    // any three of the four revealed bundles recover the seed
    for skipped in 0..bundles.len() {
        let subset = bundles
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skipped)
            .map(|(_, bundle)| bundle.clone())
            .collect::<Vec<_>>();
        assert_eq!(SelfSeed::from_bundles(&subset).unwrap(), seed);
    }
}

#[test]
fn test_own_share() {
    let mut clients = setup(2, 3);
    share_keys(&mut clients);
    exchange_shares(&mut clients);

    let own_share = clients[0].own_share(2).unwrap().unwrap();
    assert!(clients[0].own_share(7).unwrap().is_none());
    let kept = ShareBundle::from_byte_slice(&clients[0].own_share(1).unwrap().unwrap()).unwrap();
    assert_eq!(kept.index, 1);

    // the share that client 2 reveals for client 1 is the one client 1 sent
    clients[1].mask_model_update(&[0; 4]).unwrap();
    let mut revealed = clients[1].reveal_shares_for_dropped(&[1]).unwrap();
    assert_eq!(revealed.remove(&1).unwrap(), own_share);

    // the kept bundle completes a threshold of bundles
    let sent = ShareBundle::from_byte_slice(&own_share).unwrap();
    assert_eq!(
        &SelfSeed::from_bundles(&[kept, sent]).unwrap(),
        clients[0].self_seed().unwrap()
    );
}

#[test]
fn test_faulty_shares_are_skipped() {
    let mut clients = setup(2, 3);
    share_keys(&mut clients);
    let mut outgoing = generate_shares(&mut clients);

    // the share of client 1 for client 2 is corrupted in transit
    let corrupted = outgoing[0].1.get_mut(&2).unwrap();
    let payload: &mut Vec<u8> = corrupted.as_mut();
    payload[20] ^= 1;

    let mut shares = shares_for(&outgoing, 2);
    // a sender without a shared secret
    let unknown = shares[&3].clone();
    shares.insert(9, unknown);
    // a share of client 3 for client 2, encrypted under the key of clients 3 and 2
    let misdirected = outgoing[2].1[&2].clone();
    let mut misdirected_shares = EncryptedShares::new();
    misdirected_shares.insert(3, misdirected);

    clients[1].receive_encrypted_shares(&shares).unwrap();
    assert_eq!(clients[1].stage(), Stage::CollectMaskedVectors);
    clients[1].mask_model_update(&[0; 4]).unwrap();
    let revealed = clients[1].reveal_shares_for_dropped(&[1, 3, 9]).unwrap();
    assert_eq!(revealed.keys().copied().collect::<Vec<_>>(), vec![3]);

    // client 1 fails to decrypt it with the key of clients 1 and 3
    clients[0].receive_encrypted_shares(&misdirected_shares).unwrap();
    clients[0].mask_model_update(&[0; 4]).unwrap();
    assert!(clients[0]
        .reveal_shares_for_dropped(&[3])
        .unwrap()
        .is_empty());
}

#[test]
fn test_partial_trailing_group() {
    let mut clients = setup(1, 1);
    share_keys(&mut clients);
    exchange_shares(&mut clients);
    let masked = clients[0].mask_model_update(&[1, 2, 3, 4, 5]).unwrap();
    assert_eq!(masked.len(), 5);
}

#[test]
fn test_mask_quantized() {
    let mut clients = setup(2, 3);
    share_keys(&mut clients);
    exchange_shares(&mut clients);

    let mut prng = ChaCha20Rng::from_seed([2; 32]);
    let updates = (0..3)
        .map(|_| (0..10).map(|_| prng.gen_range(-1.0..1.0)).collect::<Vec<f64>>())
        .collect::<Vec<_>>();

    let mut aggregation = Aggregation::new(1 << 32, 40).unwrap();
    for (client, update) in clients.iter_mut().zip(&updates) {
        let masked = client.mask_quantized(update).unwrap();
        assert_eq!(masked.len(), 40);
        aggregation.aggregate(&masked).unwrap();
    }
    let everyone = vec![1, 2, 3];
    let revealed = clients
        .iter_mut()
        .map(|client| client.reveal_shares_for_dropped(&everyone).unwrap())
        .collect::<Vec<_>>();
    for index in everyone {
        aggregation
            .remove_self_mask(&recover_seed(&revealed, index))
            .unwrap();
    }

    let config = SessionConfig::new("session", 1, 2, 3, 1);
    let step = 2.0 * config.clipping_range / f64::from(config.target_range);
    let sums = dequantize_sum(
        aggregation.elements(),
        config.clipping_range,
        config.target_range,
        3,
    );
    for (k, sum) in sums.iter().enumerate() {
        let expected = updates.iter().map(|update| update[k]).sum::<f64>();
        assert!((sum - expected).abs() <= 3.0 * step + 1e-9);
    }
}
