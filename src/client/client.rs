use tracing::{debug, info, warn};

use crate::{
    client::{state::SessionState, ClientError, Stage},
    common::SessionConfig,
    crypto::ByteObject,
    mask::{encode_elements, pairwise_mask, quantize, ModVector, SelfSeed, ELEMENT_BYTES},
    sharing::ToBytes,
    EncryptedShares,
    KeyPair,
    ParticipantIndex,
    ParticipantPublicKey,
    PeerPublicKeys,
    RevealedShares,
};

/// Gets the session state if the client is in the `expected` stage.
fn checked(
    state: &mut Option<SessionState>,
    actual: Stage,
    expected: Stage,
) -> Result<&mut SessionState, ClientError> {
    let error = ClientError::ProtocolState { expected, actual };
    if actual != expected {
        return Err(error);
    }
    state.as_mut().ok_or(error)
}

/// The client side of one round of secure aggregation.
///
/// The client is driven through its [`Stage`]s by a coordination layer, which delivers the
/// payloads of the peers and forwards the payloads of the client:
///
/// 1. [`receive_peer_public_keys()`] in [`Stage::Setup`]
/// 2. [`generate_encrypted_shares()`], then [`receive_encrypted_shares()`] in
///    [`Stage::ShareKeys`]
/// 3. [`mask_model_update()`] or [`mask_quantized()`] in [`Stage::CollectMaskedVectors`]
/// 4. [`reveal_shares_for_dropped()`] or [`complete()`] in [`Stage::Unmask`]
///
/// Every operation fails with [`ClientError::ProtocolState`] if it is called in another stage.
/// Problems with the payloads of single peers are logged and the peers are skipped, since the
/// round tolerates peers which drop out.
///
/// [`receive_peer_public_keys()`]: SecAggClient::receive_peer_public_keys
/// [`generate_encrypted_shares()`]: SecAggClient::generate_encrypted_shares
/// [`receive_encrypted_shares()`]: SecAggClient::receive_encrypted_shares
/// [`mask_model_update()`]: SecAggClient::mask_model_update
/// [`mask_quantized()`]: SecAggClient::mask_quantized
/// [`reveal_shares_for_dropped()`]: SecAggClient::reveal_shares_for_dropped
/// [`complete()`]: SecAggClient::complete
#[derive(Debug)]
pub struct SecAggClient {
    config: SessionConfig,
    stage: Stage,
    public: ParticipantPublicKey,
    state: Option<SessionState>,
}

impl SecAggClient {
    /// Creates a client for the round described by the `config` with a fresh key pair and seed.
    ///
    /// # Errors
    /// Fails if the `config` is invalid or if the crypto layer can't be initialized.
    pub fn new(config: SessionConfig) -> Result<Self, ClientError> {
        config.validate()?;
        crate::init()?;

        let keys = KeyPair::generate();
        let public = keys.public;
        info!(
            "client {} joins round {} of session {}",
            config.client_index, config.round_id, config.session_id
        );
        Ok(Self {
            config,
            stage: Stage::Setup,
            public,
            state: Some(SessionState::new(keys, SelfSeed::generate())),
        })
    }

    /// Gets the public key of the client for this round.
    pub fn public_key(&self) -> ParticipantPublicKey {
        self.public
    }

    /// Gets the current stage of the client.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Gets the parameters of the round.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Computes the shared secrets with the peers from their public keys.
    ///
    /// The own key is ignored. Keys of peers with an index outside of the round and low order
    /// keys are logged and skipped.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::Setup`].
    pub fn receive_peer_public_keys(&mut self, keys: &PeerPublicKeys) -> Result<(), ClientError> {
        let state = checked(&mut self.state, self.stage, Stage::Setup)?;
        let own_index = self.config.client_index;

        for (index, key) in keys {
            if *index == own_index {
                continue;
            }
            if !self.config.contains(*index) {
                warn!("ignoring the public key of unknown participant {}", index);
                continue;
            }
            match state.keys.secret.agree(key) {
                Ok(secret) => {
                    debug!("computed the shared secret with participant {}", index);
                    state.peers.public_keys.insert(*index, *key);
                    state.peers.shared_secrets.insert(*index, secret);
                }
                Err(err) => warn!("ignoring the public key of participant {}: {}", index, err),
            }
        }

        info!(
            "received the public keys of {} peers",
            state.peers.shared_secrets.len()
        );
        self.stage = Stage::ShareKeys;
        Ok(())
    }

    /// Shares the self seed among all participants of the round and encrypts the bundle of each
    /// peer with the key derived from the shared secret of the pair.
    ///
    /// The client keeps its own bundle. Peers without a shared secret are logged and receive
    /// nothing. Repeated calls encrypt the same bundles again.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::ShareKeys`].
    pub fn generate_encrypted_shares(&mut self) -> Result<EncryptedShares, ClientError> {
        let state = checked(&mut self.state, self.stage, Stage::ShareKeys)?;
        let own_index = self.config.client_index;

        if !state.shares_generated() {
            let bundles = state
                .seed
                .share(self.config.threshold, self.config.total_clients)?;
            for bundle in bundles {
                if bundle.index == own_index {
                    state.own_bundle = Some(bundle);
                } else {
                    state.peers.outgoing.insert(bundle.index, bundle);
                }
            }
            debug!(
                "shared the self seed with threshold {} among {} participants",
                self.config.threshold, self.config.total_clients
            );
        }

        let mut encrypted = EncryptedShares::new();
        for (index, bundle) in &state.peers.outgoing {
            match state.peers.shared_secrets.get(index) {
                Some(secret) => {
                    encrypted.insert(*index, bundle.encrypt(&secret.share_key()));
                }
                None => warn!("no shared secret with participant {}, skipping its share", index),
            }
        }
        Ok(encrypted)
    }

    /// Decrypts the shares of the seeds of the peers, keyed by sender.
    ///
    /// Shares of senders without a shared secret, shares which fail to decrypt or to decode and
    /// shares addressed to someone else are logged and skipped. The client advances to
    /// [`Stage::CollectMaskedVectors`] in any case.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::ShareKeys`] or if it has not generated its own
    /// shares yet.
    pub fn receive_encrypted_shares(&mut self, shares: &EncryptedShares) -> Result<(), ClientError> {
        let state = checked(&mut self.state, self.stage, Stage::ShareKeys)?;
        let own_index = self.config.client_index;
        let nb_values = state
            .own_bundle
            .as_ref()
            .map(|bundle| bundle.values.len())
            .ok_or(ClientError::SharesNotGenerated)?;

        for (sender, share) in shares {
            if *sender == own_index {
                continue;
            }
            let secret = match state.peers.shared_secrets.get(sender) {
                Some(secret) => secret,
                None => {
                    warn!("no shared secret with participant {}, skipping its share", sender);
                    continue;
                }
            };
            match share.decrypt(&secret.share_key()) {
                Ok(bundle) if bundle.index == own_index && bundle.values.len() == nb_values => {
                    debug!("received the share of participant {}", sender);
                    state.peers.incoming.insert(*sender, bundle);
                }
                Ok(bundle) => warn!(
                    "skipping the share of participant {}: it is addressed to participant {}",
                    sender, bundle.index
                ),
                Err(err) => warn!("skipping the share of participant {}: {}", sender, err),
            }
        }

        info!(
            "received the shares of {} peers",
            state.peers.incoming.len()
        );
        self.stage = Stage::CollectMaskedVectors;
        Ok(())
    }

    /// Masks a model update, given as big endian 32 bit integers.
    ///
    /// The update is reduced modulo the mask range. The pairwise mask of every peer with a
    /// shared secret is added if the own index is larger than the index of the peer and
    /// subtracted otherwise. Finally the self mask is added. The masked update has the length of
    /// the raw update. A trailing partial group of fewer than four bytes is padded with zeros for
    /// masking and truncated again afterwards, which loses the carry into the cut bytes.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::CollectMaskedVectors`].
    pub fn mask_model_update(&mut self, raw: &[u8]) -> Result<Vec<u8>, ClientError> {
        let state = checked(&mut self.state, self.stage, Stage::CollectMaskedVectors)?;
        let own_index = self.config.client_index;
        let mod_range = self.config.mod_range;
        let context = self.config.context();

        // safe unwrap: the mask range of the config was checked on creation of the client
        let mut vector = ModVector::from_bytes(raw, mod_range).unwrap();
        let len = vector.len();
        for (peer, secret) in &state.peers.shared_secrets {
            let mask = pairwise_mask(secret, &context, mod_range, len);
            // safe unwraps: the masks are derived with the length of the vector
            if own_index > *peer {
                vector.add_mask(&mask).unwrap();
            } else {
                vector.sub_mask(&mask).unwrap();
            }
        }
        vector
            .add_mask(&state.seed.derive_mask(len, mod_range))
            .unwrap();

        info!("masked a model update of {} elements", len);
        self.stage = Stage::Unmask;
        Ok(vector.to_bytes(raw.len()))
    }

    /// Quantizes a float model update with the clipping and target ranges of the round and masks
    /// it like [`mask_model_update()`].
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::CollectMaskedVectors`].
    ///
    /// [`mask_model_update()`]: SecAggClient::mask_model_update
    pub fn mask_quantized(&mut self, values: &[f64]) -> Result<Vec<u8>, ClientError> {
        checked(&mut self.state, self.stage, Stage::CollectMaskedVectors)?;
        let quantized = quantize(
            values,
            self.config.clipping_range,
            self.config.target_range,
        );
        let raw = encode_elements(&quantized, quantized.len() * ELEMENT_BYTES);
        self.mask_model_update(&raw)
    }

    /// Reveals the serialized shares of the seeds of the `dropped` participants and completes
    /// the round.
    ///
    /// The own index yields the bundle the client kept of its own seed. Indices without a held
    /// share are logged and skipped.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::Unmask`].
    pub fn reveal_shares_for_dropped(
        &mut self,
        dropped: &[ParticipantIndex],
    ) -> Result<RevealedShares, ClientError> {
        let state = checked(&mut self.state, self.stage, Stage::Unmask)?;
        let own_index = self.config.client_index;

        let mut revealed = RevealedShares::new();
        for index in dropped {
            let bundle = if *index == own_index {
                state.own_bundle.as_ref()
            } else {
                state.peers.incoming.get(index)
            };
            match bundle {
                Some(bundle) => {
                    revealed.insert(*index, bundle.to_vec());
                }
                None => warn!("no share of participant {} to reveal", index),
            }
        }

        info!("revealed the shares of {} participants", revealed.len());
        self.finish();
        Ok(revealed)
    }

    /// Completes the round without revealing any shares.
    ///
    /// # Errors
    /// Fails if the client is not in [`Stage::Unmask`].
    pub fn complete(&mut self) -> Result<(), ClientError> {
        checked(&mut self.state, self.stage, Stage::Unmask)?;
        self.finish();
        Ok(())
    }

    /// Gets the serialized share bundle of the own seed which is meant for `peer`.
    ///
    /// This is available from the moment the shares are generated until the round is completed.
    /// The own index yields the bundle the client kept for itself.
    ///
    /// # Errors
    /// Fails with [`ClientError::SharesNotGenerated`] if the shares are not generated yet. Fails
    /// with [`ClientError::ProtocolState`] if the client is in none of [`Stage::ShareKeys`],
    /// [`Stage::CollectMaskedVectors`] and [`Stage::Unmask`]. The error then names
    /// [`Stage::ShareKeys`] as the expected stage, being the first stage in which the shares
    /// exist.
    pub fn own_share(&self, peer: ParticipantIndex) -> Result<Option<Vec<u8>>, ClientError> {
        let state = match (self.stage, self.state.as_ref()) {
            (Stage::ShareKeys, Some(state))
            | (Stage::CollectMaskedVectors, Some(state))
            | (Stage::Unmask, Some(state)) => state,
            (actual, _) => {
                return Err(ClientError::ProtocolState {
                    expected: Stage::ShareKeys,
                    actual,
                })
            }
        };
        if !state.shares_generated() {
            return Err(ClientError::SharesNotGenerated);
        }

        let bundle = if peer == self.config.client_index {
            state.own_bundle.as_ref()
        } else {
            state.peers.outgoing.get(&peer)
        };
        Ok(bundle.map(|bundle| bundle.to_vec()))
    }

    /// Drops the session material and advances to the terminal stage.
    fn finish(&mut self) {
        self.state = None;
        self.stage = Stage::Completed;
        info!(
            "client {} completed round {}",
            self.config.client_index, self.config.round_id
        );
    }
}

#[cfg(test)]
impl SecAggClient {
    pub(crate) fn self_seed(&self) -> Option<&SelfSeed> {
        self.state.as_ref().map(|state| &state.seed)
    }

    pub(crate) fn shared_secret(
        &self,
        peer: ParticipantIndex,
    ) -> Option<&crate::crypto::SharedSecret> {
        self.state
            .as_ref()
            .and_then(|state| state.peers.shared_secrets.get(&peer))
    }
}
