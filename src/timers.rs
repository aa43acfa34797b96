use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Weak;
use std::time::{Duration, SystemTime};

use log::debug;
use rand::Rng;
use spin::RwLockReadGuard;

use super::constants::*;
use super::peer::PeerInner;
use super::timer::Timer;
use super::types::{Callbacks, Scheduler};

pub struct Timers<C: Callbacks> {
    handshake_attempts: AtomicUsize,
    sent_lastminute_handshake: AtomicBool,
    need_another_keepalive: AtomicBool,

    pub(crate) retransmit_handshake: Timer<PeerInner<C>>,
    pub(crate) send_keepalive: Timer<PeerInner<C>>,
    pub(crate) new_handshake: Timer<PeerInner<C>>,
    pub(crate) zero_key_material: Timer<PeerInner<C>>,
    pub(crate) send_persistent_keepalive: Timer<PeerInner<C>>,
}

#[inline(always)]
fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..REKEY_TIMEOUT_JITTER_MAX_MS))
}

impl<C: Callbacks> Timers<C> {
    /// Create the timers of a peer, all initially disarmed.
    pub fn new(scheduler: &dyn Scheduler, peer: Weak<PeerInner<C>>) -> Timers<C> {
        Timers {
            handshake_attempts: AtomicUsize::new(0),
            sent_lastminute_handshake: AtomicBool::new(false),
            need_another_keepalive: AtomicBool::new(false),
            retransmit_handshake: Timer::new(
                scheduler,
                peer.clone(),
                expired_retransmit_handshake::<C>,
            ),
            send_keepalive: Timer::new(scheduler, peer.clone(), expired_send_keepalive::<C>),
            new_handshake: Timer::new(scheduler, peer.clone(), expired_new_handshake::<C>),
            zero_key_material: Timer::new(
                scheduler,
                peer.clone(),
                expired_zero_key_material::<C>,
            ),
            send_persistent_keepalive: Timer::new(
                scheduler,
                peer,
                expired_persistent_keepalive::<C>,
            ),
        }
    }

    /// Disarm every timer and wait for expirations in progress.
    ///
    /// On return no timer callback of the peer is running.
    pub fn stop(&self) {
        self.retransmit_handshake.stop_sync();
        self.send_keepalive.stop_sync();
        self.new_handshake.stop_sync();
        self.zero_key_material.stop_sync();
        self.send_persistent_keepalive.stop_sync();
    }

    fn reset_state(&self) {
        self.handshake_attempts.store(0, Ordering::Release);
        self.sent_lastminute_handshake
            .store(false, Ordering::Release);
        self.need_another_keepalive.store(false, Ordering::Release);
    }

    pub fn handshake_attempts(&self) -> usize {
        self.handshake_attempts.load(Ordering::Acquire)
    }

    pub fn need_another_keepalive(&self) -> bool {
        self.need_another_keepalive.load(Ordering::Acquire)
    }

    pub fn sent_lastminute_handshake(&self) -> bool {
        self.sent_lastminute_handshake.load(Ordering::Acquire)
    }
}

impl<C: Callbacks> PeerInner<C> {
    /* Timers are only (re)armed when the peer is running,
     * the device is up and the device has at least one peer.
     *
     * The returned guard prevents the peer from being stopped,
     * it must be dropped before invoking any of the callbacks.
     * It is only held for the check and a single timer (re)arm,
     * which bounds the wait of a concurrent stop.
     */
    fn timers_gate(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let running = self.running()?;
        let device = self.device()?;
        if device.is_up() && device.peer_count() > 0 {
            Some(running)
        } else {
            None
        }
    }

    pub fn timers_active(&self) -> bool {
        self.timers_gate().is_some()
    }

    pub(crate) fn start_timers(&self) {
        self.timers.reset_state();

        // cause immediate expiry of persistent_keepalive timer
        if self.get_keepalive_interval() > 0 {
            if let Some(_running) = self.timers_gate() {
                self.timers
                    .send_persistent_keepalive
                    .reset(Duration::from_secs(0));
            }
        }
    }

    /* should be called after an authenticated data packet is sent */
    pub fn timers_data_sent(&self) {
        log::trace!("{} : timers_data_sent", self);
        if let Some(_running) = self.timers_gate() {
            if !self.timers.new_handshake.is_pending() {
                self.timers
                    .new_handshake
                    .reset(KEEPALIVE_TIMEOUT + REKEY_TIMEOUT + jitter());
            }
        }
    }

    /* should be called after an authenticated data packet is received */
    pub fn timers_data_received(&self) {
        log::trace!("{} : timers_data_received", self);
        if let Some(_running) = self.timers_gate() {
            if !self.timers.send_keepalive.is_pending() {
                self.timers.send_keepalive.reset(KEEPALIVE_TIMEOUT);
            } else {
                self.timers
                    .need_another_keepalive
                    .store(true, Ordering::Release);
            }
        }
    }

    /* Should be called after any type of authenticated packet is sent, whether:
     * - keepalive
     * - data
     * - handshake
     */
    pub fn timers_any_authenticated_packet_sent(&self) {
        log::trace!("{} : timers_any_authenticated_packet_sent", self);
        if let Some(_running) = self.timers_gate() {
            self.timers.send_keepalive.stop();
        }
    }

    /* Should be called after any type of authenticated packet is received, whether:
     * - keepalive
     * - data
     * - handshake
     */
    pub fn timers_any_authenticated_packet_received(&self) {
        log::trace!("{} : timers_any_authenticated_packet_received", self);
        if let Some(_running) = self.timers_gate() {
            self.timers.new_handshake.stop();
        }
    }

    /* Should be called after a handshake initiation message is sent. */
    pub fn timers_handshake_initiated(&self) {
        log::trace!("{} : timers_handshake_initiated", self);
        if let Some(_running) = self.timers_gate() {
            let attempts = self.timers.handshake_attempts().max(1) as u64;
            let timeout = REKEY_TIMEOUT.min(Duration::from_secs(attempts));
            self.timers.retransmit_handshake.reset(timeout + jitter());
        }
    }

    /* Should be called after a handshake response message is received and processed
     * or when getting key confirmation via the first data message.
     */
    pub fn timers_handshake_complete(&self) {
        log::trace!("{} : timers_handshake_complete", self);
        if let Some(_running) = self.timers_gate() {
            self.timers.retransmit_handshake.stop();
        }
        self.timers.handshake_attempts.store(0, Ordering::Release);
        self.timers
            .sent_lastminute_handshake
            .store(false, Ordering::Release);
        *self.walltime_last_handshake.lock() = Some(SystemTime::now());
    }

    /* Should be called after an ephemeral key is created, which is before sending a
     * handshake response or after receiving a handshake response.
     */
    pub fn timers_session_derived(&self) {
        log::trace!("{} : timers_session_derived", self);
        if let Some(_running) = self.timers_gate() {
            self.timers
                .zero_key_material
                .reset(ZERO_KEY_MATERIAL_TIMEOUT);
        }
    }

    /* Should be called before a packet with authentication, whether
     * keepalive, data, or handshake is sent, or after one is received.
     */
    pub fn timers_any_authenticated_packet_traversal(&self) {
        log::trace!("{} : timers_any_authenticated_packet_traversal", self);
        if let Some(_running) = self.timers_gate() {
            let interval = self.get_keepalive_interval();
            if interval > 0 {
                // push persistent_keepalive into the future
                self.timers
                    .send_persistent_keepalive
                    .reset(Duration::from_secs(interval));
            }
        }
    }

    /* Called after the handshake layer sends a handshake initiation to the peer */
    pub fn sent_handshake_initiation(&self) {
        self.timers_any_authenticated_packet_traversal();
        self.timers_any_authenticated_packet_sent();
        self.timers_handshake_initiated();
    }

    pub fn sent_handshake_response(&self) {
        self.timers_any_authenticated_packet_traversal();
        self.timers_any_authenticated_packet_sent();
    }

    /* Called after a transport message is sent to the peer,
     * a keepalive carries an empty payload.
     */
    pub fn packet_sent(&self, payload: usize) {
        self.timers_any_authenticated_packet_traversal();
        self.timers_any_authenticated_packet_sent();
        if payload > 0 {
            self.timers_data_sent();
        }
    }

    /* Called after a transport message from the peer is authenticated */
    pub fn packet_received(&self, payload: usize) {
        self.timers_any_authenticated_packet_traversal();
        self.timers_any_authenticated_packet_received();
        if payload > 0 {
            self.timers_data_received();
        }
    }

    pub fn key_confirmed(&self) {
        self.timers_handshake_complete();
    }

    /// Claim the "last minute" handshake of the current session.
    ///
    /// Returns true for the first caller only,
    /// until the next handshake completes.
    pub fn mark_lastminute_handshake(&self) -> bool {
        !self
            .timers
            .sent_lastminute_handshake
            .swap(true, Ordering::AcqRel)
    }

    pub fn set_persistent_keepalive_interval(&self, secs: u64) {
        self.store_keepalive_interval(secs);

        // stop the keepalive timer with the old interval
        self.timers.send_persistent_keepalive.stop();

        // cause immediate expiry of persistent_keepalive timer
        if secs > 0 {
            if let Some(_running) = self.timers_gate() {
                self.timers
                    .send_persistent_keepalive
                    .reset(Duration::from_secs(0));
            }
        }
    }

    pub fn packet_send_queued_handshake_initiation(&self, is_retry: bool) {
        if !is_retry {
            self.timers.handshake_attempts.store(0, Ordering::Release);
        }
        C::send_handshake_initiation(self, is_retry);
    }
}

fn expired_retransmit_handshake<C: Callbacks>(peer: &PeerInner<C>) {
    log::trace!("{} : timer fired (retransmit_handshake)", peer);
    let timers = &peer.timers;

    if timers.handshake_attempts() > MAX_TIMER_HANDSHAKES {
        debug!(
            "{} : handshake did not complete after {} attempts, giving up",
            peer,
            MAX_TIMER_HANDSHAKES + 2
        );

        if let Some(_running) = peer.timers_gate() {
            timers.send_keepalive.stop();
        }

        // drop all packets without a keypair and don't try again
        C::flush_staged_packets(peer);

        // destroy any residue of the partial exchange
        if let Some(_running) = peer.timers_gate() {
            if !timers.zero_key_material.is_pending() {
                timers.zero_key_material.reset(ZERO_KEY_MATERIAL_TIMEOUT);
            }
        }
    } else {
        timers.handshake_attempts.fetch_add(1, Ordering::AcqRel);

        // the source address may be the cause of trouble
        peer.clear_src();
        peer.packet_send_queued_handshake_initiation(true);
    }
}

fn expired_send_keepalive<C: Callbacks>(peer: &PeerInner<C>) {
    log::trace!("{} : timer fired (send_keepalive)", peer);
    C::send_keepalive(peer);

    let timers = &peer.timers;
    if timers.need_another_keepalive.swap(false, Ordering::AcqRel) {
        if let Some(_running) = peer.timers_gate() {
            timers.send_keepalive.reset(KEEPALIVE_TIMEOUT);
        }
    }
}

fn expired_new_handshake<C: Callbacks>(peer: &PeerInner<C>) {
    debug!(
        "{} : retrying handshake because we stopped hearing back after {} seconds",
        peer,
        (KEEPALIVE_TIMEOUT + REKEY_TIMEOUT).as_secs()
    );

    // the source address may be the cause of trouble
    peer.clear_src();
    peer.packet_send_queued_handshake_initiation(false);
}

fn expired_zero_key_material<C: Callbacks>(peer: &PeerInner<C>) {
    debug!(
        "{} : removing all keys, since we haven't received a new one in {} seconds",
        peer,
        ZERO_KEY_MATERIAL_TIMEOUT.as_secs()
    );
    C::zero_keys(peer);
}

fn expired_persistent_keepalive<C: Callbacks>(peer: &PeerInner<C>) {
    log::trace!("{} : timer fired (send_persistent_keepalive)", peer);
    if peer.get_keepalive_interval() > 0 {
        C::send_keepalive(peer);
    }
}
