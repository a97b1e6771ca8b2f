// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-scope message pump: sequence-number allocation, RDM command/
//! response correlation, and ACK_OVERFLOW reassembly (spec.md §4.7).
//!
//! Sans-IO, like the LLRP engines: [`Session`] consumes already-decoded
//! [`RptPdu`]s and returns [`SessionEvent`]s. The broker connection
//! itself — reading bytes off the wire and framing them into PDUs — is
//! [`crate::transport::tcp::BrokerConnection`]'s job.

use std::collections::HashMap;
use std::time::Instant;

use crate::core::uid::Uid;
use crate::protocol::rdm::{CommandClass, RdmMessage, ResponseType};
use crate::protocol::rpt::{decode_rdm_chain, RptHeader, RptPdu, RptVector};

/// Identifies one ACK_OVERFLOW reassembly chain: spec.md §4.7 merges
/// "consecutive responses with matching source UID, destination UID,
/// PID, and command-class."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReassemblyKey {
    source_uid: Uid,
    dest_uid: Uid,
    pid: u16,
    command_class: CommandClass,
}

/// Buffers in-progress ACK_OVERFLOW chains and merges them into one
/// logical response once a non-overflow response type is seen.
#[derive(Default)]
struct AckOverflowAssembler {
    chains: HashMap<ReassemblyKey, Vec<RdmMessage>>,
}

impl AckOverflowAssembler {
    /// Feed one decoded response. Returns the merged response once the
    /// chain completes (immediately, for a chain of length one).
    fn ingest(&mut self, msg: RdmMessage) -> Option<RdmMessage> {
        let key = ReassemblyKey {
            source_uid: msg.src_uid,
            dest_uid: msg.dest_uid,
            pid: msg.pid,
            command_class: msg.command_class,
        };
        let is_overflow = msg.response_type() == Ok(ResponseType::AckOverflow);

        if is_overflow {
            self.chains.entry(key).or_default().push(msg);
            return None;
        }

        match self.chains.remove(&key) {
            Some(mut buffered) => {
                let mut parameter_data = buffered.iter().flat_map(|m| m.parameter_data.iter().copied()).collect::<Vec<_>>();
                parameter_data.extend_from_slice(&msg.parameter_data);
                let mut merged = msg;
                merged.parameter_data = parameter_data;
                buffered.clear();
                Some(merged)
            }
            None => Some(msg),
        }
    }

    /// Drop any chain untouched since `deadline` (spec.md §4.7: "timeout
    /// ... dropped with log"). The session layer decides the timeout
    /// window; this only performs the drop.
    fn drop_chain(&mut self, key_source: Uid, key_dest: Uid, pid: u16, command_class: CommandClass) {
        self.chains.remove(&ReassemblyKey { source_uid: key_source, dest_uid: key_dest, pid, command_class });
    }
}

/// An outstanding RDM command awaiting correlation with a response.
#[derive(Debug, Clone, Copy)]
struct PendingCommand {
    dest_uid: Uid,
    pid: u16,
    command_class: CommandClass,
    sent_at: Instant,
}

/// Events the session layer surfaces to the owning `Controller`/`Device`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A response matched an outstanding command by (source UID, sequence).
    RdmResponse { source_uid: Uid, sequence: u32, message: RdmMessage },
    /// A response/request with no matching pending command — delivered
    /// as an unsolicited notification. `sequence` must be echoed back
    /// verbatim in any reply (spec.md §4.7: the RPT header sequence
    /// correlates a device's response to the triggering request).
    Unsolicited { sequence: u32, message: RdmMessage },
    RptStatus(crate::protocol::rpt::RptStatusPayload),
}

/// One scope's RPT message pump.
pub struct Session {
    next_sequence: u32,
    pending: HashMap<(Uid, u32), PendingCommand>,
    reassembler: AckOverflowAssembler,
    max_pending: usize,
}

impl Session {
    #[must_use]
    pub fn new(max_pending: usize) -> Self {
        Self { next_sequence: 0, pending: HashMap::new(), reassembler: AckOverflowAssembler::default(), max_pending }
    }

    /// Allocate the next sequence number and build the PDU to send,
    /// recording a pending correlation entry.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::NoMemory`] if `max_pending` is
    /// already tracking as many outstanding commands as configured.
    pub fn send_command(
        &mut self,
        source_uid: Uid,
        dest_uid: Uid,
        command_class: CommandClass,
        pid: u16,
        parameter_data: Vec<u8>,
        now: Instant,
    ) -> crate::error::Result<(u32, RptPdu)> {
        if self.pending.len() >= self.max_pending {
            return Err(crate::error::Error::NoMemory);
        }
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let rdm = RdmMessage {
            dest_uid,
            src_uid: source_uid,
            transaction_number: sequence as u8,
            port_id_or_response_type: 1,
            message_count: 0,
            sub_device: 0,
            command_class,
            pid,
            parameter_data,
        };
        let pdu = RptPdu {
            header: RptHeader { source_uid, source_endpoint: 0, dest_uid, dest_endpoint: 0, sequence },
            vector: RptVector::Request,
            payload: rdm.encode().map_err(|_| crate::error::Error::InvalidArgument("parameter_data"))?,
        };
        self.pending.insert(
            (source_uid, sequence),
            PendingCommand { dest_uid, pid, command_class, sent_at: now },
        );
        Ok((sequence, pdu))
    }

    /// Decode and correlate one inbound RPT PDU, reassembling
    /// ACK_OVERFLOW chains as needed.
    pub fn on_rpt_pdu(&mut self, pdu: &RptPdu) -> crate::error::Result<Vec<SessionEvent>> {
        let mut events = Vec::new();
        match pdu.vector {
            RptVector::Status => {
                let status = crate::protocol::rpt::RptStatusPayload::decode(&pdu.payload)
                    .map_err(|_| crate::error::Error::MalformedMessage("rpt status"))?;
                events.push(SessionEvent::RptStatus(status));
            }
            RptVector::Request | RptVector::Notification => {
                let messages = decode_rdm_chain(&pdu.payload)
                    .map_err(|_| crate::error::Error::MalformedMessage("rdm chain"))?;
                for msg in messages {
                    if let Some(merged) = self.reassembler.ingest(msg) {
                        events.push(self.correlate(merged, pdu.header.sequence));
                    }
                }
            }
        }
        Ok(events)
    }

    fn correlate(&mut self, message: RdmMessage, sequence: u32) -> SessionEvent {
        let key = (message.dest_uid, sequence);
        if self.pending.remove(&key).is_some() {
            SessionEvent::RdmResponse { source_uid: message.dest_uid, sequence, message }
        } else {
            SessionEvent::Unsolicited { sequence, message }
        }
    }

    /// Drop pending commands older than `timeout`, releasing any
    /// buffered ACK_OVERFLOW chain for the same correlation key
    /// (spec.md §4.7, "incomplete chains interrupted ... by timeout").
    pub fn expire_stale_commands(&mut self, now: Instant, timeout: std::time::Duration) {
        let stale: Vec<(Uid, u32)> = self
            .pending
            .iter()
            .filter(|(_, cmd)| now.duration_since(cmd.sent_at) > timeout)
            .map(|(k, _)| *k)
            .collect();
        for key in stale {
            if let Some(cmd) = self.pending.remove(&key) {
                self.reassembler.drop_chain(key.0, cmd.dest_uid, cmd.pid, cmd.command_class);
            }
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::rpt::encode_rdm_chain;

    /// Build a response as the device (`responder`) would send it back
    /// to the originating command's source.
    fn response(command_source: Uid, responder: Uid, response_type: ResponseType, data: Vec<u8>) -> RdmMessage {
        RdmMessage {
            dest_uid: command_source,
            src_uid: responder,
            transaction_number: 0,
            port_id_or_response_type: response_type.to_u8(),
            message_count: 0,
            sub_device: 0,
            command_class: CommandClass::GetCommandResponse,
            pid: 0x0060,
            parameter_data: data,
        }
    }

    #[test]
    fn send_command_then_correlates_matching_response() {
        let mut session = Session::new(8);
        let controller = Uid::new(0x6574, 1);
        let device = Uid::new(0x6574, 2);
        let now = Instant::now();
        let (sequence, _pdu) = session
            .send_command(controller, device, CommandClass::GetCommand, 0x0060, vec![], now)
            .unwrap();

        let resp = response(controller, device, ResponseType::Ack, vec![1, 2, 3]);
        let chain_bytes = encode_rdm_chain(&[resp]).unwrap();
        let pdu = RptPdu {
            header: RptHeader { source_uid: device, source_endpoint: 0, dest_uid: controller, dest_endpoint: 0, sequence },
            vector: RptVector::Notification,
            payload: chain_bytes,
        };
        let events = session.on_rpt_pdu(&pdu).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::RdmResponse { sequence: s, message, .. } => {
                assert_eq!(*s, sequence);
                assert_eq!(message.parameter_data, vec![1, 2, 3]);
            }
            other => panic!("expected RdmResponse, got {other:?}"),
        }
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn ack_overflow_chain_concatenates_parameter_data() {
        let mut session = Session::new(8);
        let controller = Uid::new(0x6574, 1);
        let device = Uid::new(0x6574, 2);
        let now = Instant::now();
        let (sequence, _) = session
            .send_command(controller, device, CommandClass::GetCommand, 0x0060, vec![], now)
            .unwrap();

        let part1 = response(controller, device, ResponseType::AckOverflow, vec![1, 2]);
        let part2 = response(controller, device, ResponseType::AckOverflow, vec![3, 4]);
        let part3 = response(controller, device, ResponseType::Ack, vec![5, 6]);
        let payload = encode_rdm_chain(&[part1, part2, part3]).unwrap();
        let pdu = RptPdu {
            header: RptHeader { source_uid: device, source_endpoint: 0, dest_uid: controller, dest_endpoint: 0, sequence },
            vector: RptVector::Notification,
            payload,
        };
        let events = session.on_rpt_pdu(&pdu).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::RdmResponse { message, .. } => {
                assert_eq!(message.parameter_data, vec![1, 2, 3, 4, 5, 6]);
            }
            other => panic!("expected RdmResponse, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_response_surfaces_as_unsolicited() {
        let mut session = Session::new(8);
        let controller = Uid::new(0x6574, 1);
        let device = Uid::new(0x6574, 2);
        let resp = response(controller, device, ResponseType::Ack, vec![9]);
        let payload = encode_rdm_chain(&[resp]).unwrap();
        let pdu = RptPdu {
            header: RptHeader { source_uid: device, source_endpoint: 0, dest_uid: controller, dest_endpoint: 0, sequence: 42 },
            vector: RptVector::Notification,
            payload,
        };
        let events = session.on_rpt_pdu(&pdu).unwrap();
        assert!(matches!(events[0], SessionEvent::Unsolicited { sequence: 42, .. }));
    }

    #[test]
    fn send_command_fails_once_pending_cap_is_hit() {
        let mut session = Session::new(1);
        let controller = Uid::new(0x6574, 1);
        let device = Uid::new(0x6574, 2);
        let now = Instant::now();
        session.send_command(controller, device, CommandClass::GetCommand, 0x0060, vec![], now).unwrap();
        let err = session.send_command(controller, device, CommandClass::GetCommand, 0x0060, vec![], now);
        assert!(matches!(err, Err(crate::error::Error::NoMemory)));
    }

    #[test]
    fn stale_pending_commands_expire() {
        let mut session = Session::new(8);
        let controller = Uid::new(0x6574, 1);
        let device = Uid::new(0x6574, 2);
        let now = Instant::now();
        session.send_command(controller, device, CommandClass::GetCommand, 0x0060, vec![], now).unwrap();
        assert_eq!(session.pending_count(), 1);
        session.expire_stale_commands(now + std::time::Duration::from_secs(10), std::time::Duration::from_secs(5));
        assert_eq!(session.pending_count(), 0);
    }
}
