//! greenroom-control-osc
//!
//! Live key tuning over OSC. Receives packets on a non-blocking UDP socket and turns them
//! into [`KeyControl`] updates applied to a [`SharedKeyConfig`].
//!
//! Addresses (`/param/<name>` is accepted as an alias of `/key/<name>`):
//! - `/key/similarity`, `/key/smoothness`, `/key/spill`, `/key/curve`: one number
//! - `/key/r`, `/key/g`, `/key/b`: one key color component in `[0, 1]`
//! - `/key/color r g b`: all three components
//! - `/key/preset i`: switch to preset `i` of the receiver's [`KeyPresetSet`]
//!
//! Values are applied as sent; out-of-range values are substituted by the render cycle.
//!
//! rosc 0.10.x API note:
//! - `rosc::decoder::decode_udp` returns `Result<(&[u8], OscPacket), _>` (nom-style),
//!   where the first tuple element is the *unconsumed remainder* of the buffer.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use rosc::{OscPacket, OscType};

use greenroom_core::{ChromaKeyConfig, KeyPresetSet};
use greenroom_runtime::SharedKeyConfig;

/// One parsed control message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyControl {
    Similarity(f32),
    Smoothness(f32),
    Spill(f32),
    Curve(f32),
    /// Component index (0 = r) and value.
    KeyComponent(usize, f32),
    KeyColor([f32; 3]),
    Preset(usize),
}

impl KeyControl {
    /// Apply to `cfg`. Returns false for an index (preset or component) that does not exist.
    pub fn apply(&self, cfg: &mut ChromaKeyConfig, presets: &KeyPresetSet) -> bool {
        match *self {
            KeyControl::Similarity(v) => cfg.similarity = v,
            KeyControl::Smoothness(v) => cfg.smoothness = v,
            KeyControl::Spill(v) => cfg.spill = v,
            KeyControl::Curve(v) => cfg.curve = v,
            KeyControl::KeyComponent(i, v) => match cfg.key_color.get_mut(i) {
                Some(c) => *c = v,
                None => return false,
            },
            KeyControl::KeyColor(c) => cfg.key_color = c,
            KeyControl::Preset(i) => match presets.by_index(i) {
                Some(p) => {
                    tracing::info!(preset = %p.name, "switched key preset");
                    *cfg = p.config;
                }
                None => return false,
            },
        }
        true
    }
}

/// Non-blocking UDP OSC receiver that extracts key controls.
#[derive(Debug)]
pub struct OscKeyReceiver {
    sock: UdpSocket,
    buf: [u8; 2048],
    presets: KeyPresetSet,
}

impl OscKeyReceiver {
    /// Bind to an address like "127.0.0.1:9000" and put the socket in non-blocking mode.
    pub fn bind(addr: &str, presets: KeyPresetSet) -> io::Result<Self> {
        let sock = UdpSocket::bind(addr)?;
        sock.set_nonblocking(true)?;
        tracing::info!(addr = %sock.local_addr()?, "listening for OSC key controls");
        Ok(Self {
            sock,
            buf: [0u8; 2048],
            presets,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Drain the socket until `WouldBlock` and return every control received.
    pub fn poll(&mut self) -> Vec<KeyControl> {
        let mut out = Vec::new();

        loop {
            match self.sock.recv_from(&mut self.buf) {
                Ok((n, _from)) => match rosc::decoder::decode_udp(&self.buf[..n]) {
                    Ok((_rest, pkt)) => extract_from_packet(pkt, &mut out),
                    Err(e) => tracing::debug!("dropping undecodable OSC packet: {e:?}"),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::debug!("OSC socket error: {e}");
                    break;
                }
            }
        }

        out
    }

    /// Poll and apply everything to `shared`. Returns how many controls took effect.
    pub fn poll_into(&mut self, shared: &SharedKeyConfig) -> usize {
        let controls = self.poll();
        if controls.is_empty() {
            return 0;
        }

        let mut cfg = shared.get();
        let mut applied = 0;
        for c in &controls {
            if c.apply(&mut cfg, &self.presets) {
                applied += 1;
            } else {
                tracing::warn!(control = ?c, "ignoring OSC control");
            }
        }
        shared.set(cfg);
        applied
    }
}

/// Walk a packet/bundle tree and push parsed controls into `out`.
fn extract_from_packet(pkt: OscPacket, out: &mut Vec<KeyControl>) {
    match pkt {
        OscPacket::Message(m) => match parse_key_message(&m.addr, &m.args) {
            Some(c) => out.push(c),
            None => tracing::trace!(addr = %m.addr, "unhandled OSC message"),
        },
        OscPacket::Bundle(b) => {
            for p in b.content {
                extract_from_packet(p, out);
            }
        }
    }
}

fn as_f32(v: &OscType) -> Option<f32> {
    match *v {
        OscType::Float(x) => Some(x),
        OscType::Double(x) => Some(x as f32),
        OscType::Int(x) => Some(x as f32),
        OscType::Long(x) => Some(x as f32),
        _ => None,
    }
}

/// Parse a message into a [`KeyControl`] if it matches one of the key addresses.
pub fn parse_key_message(addr: &str, args: &[OscType]) -> Option<KeyControl> {
    let name = addr
        .strip_prefix("/key/")
        .or_else(|| addr.strip_prefix("/param/"))?;

    if name == "color" {
        let [r, g, b] = args.get(..3)? else {
            return None;
        };
        return Some(KeyControl::KeyColor([as_f32(r)?, as_f32(g)?, as_f32(b)?]));
    }

    let v = as_f32(args.first()?)?;
    let control = match name {
        "similarity" => KeyControl::Similarity(v),
        "smoothness" => KeyControl::Smoothness(v),
        "spill" => KeyControl::Spill(v),
        "curve" => KeyControl::Curve(v),
        "r" => KeyControl::KeyComponent(0, v),
        "g" => KeyControl::KeyComponent(1, v),
        "b" => KeyControl::KeyComponent(2, v),
        "preset" if v >= 0.0 && v.fract() == 0.0 => KeyControl::Preset(v as usize),
        _ => return None,
    };
    Some(control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{encoder, OscBundle, OscMessage, OscTime};

    fn msg(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn scalar_addresses() {
        assert_eq!(
            parse_key_message("/key/similarity", &[OscType::Float(0.3)]),
            Some(KeyControl::Similarity(0.3))
        );
        assert_eq!(
            parse_key_message("/param/spill", &[OscType::Double(0.25)]),
            Some(KeyControl::Spill(0.25))
        );
        assert_eq!(
            parse_key_message("/key/g", &[OscType::Int(1)]),
            Some(KeyControl::KeyComponent(1, 1.0))
        );
    }

    #[test]
    fn color_needs_three_numbers() {
        let args = [OscType::Float(0.1), OscType::Float(0.9), OscType::Int(0)];
        assert_eq!(
            parse_key_message("/key/color", &args),
            Some(KeyControl::KeyColor([0.1, 0.9, 0.0]))
        );
        assert_eq!(parse_key_message("/key/color", &args[..2]), None);
        let bad = [OscType::Float(0.1), OscType::String("x".into()), OscType::Int(0)];
        assert_eq!(parse_key_message("/key/color", &bad), None);
    }

    #[test]
    fn preset_index_must_be_whole() {
        assert_eq!(
            parse_key_message("/key/preset", &[OscType::Int(1)]),
            Some(KeyControl::Preset(1))
        );
        assert_eq!(parse_key_message("/key/preset", &[OscType::Float(0.5)]), None);
        assert_eq!(parse_key_message("/key/preset", &[OscType::Int(-1)]), None);
    }

    #[test]
    fn unknown_addresses_are_ignored() {
        assert_eq!(parse_key_message("/key/gamma", &[OscType::Float(1.0)]), None);
        assert_eq!(parse_key_message("/similarity", &[OscType::Float(1.0)]), None);
        assert_eq!(parse_key_message("/key/spill", &[]), None);
    }

    #[test]
    fn bundles_are_flattened() {
        let pkt = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                msg("/key/curve", vec![OscType::Float(2.0)]),
                msg("/nope", vec![]),
                msg("/key/smoothness", vec![OscType::Float(0.1)]),
            ],
        });
        let mut out = Vec::new();
        extract_from_packet(pkt, &mut out);
        assert_eq!(out, vec![KeyControl::Curve(2.0), KeyControl::Smoothness(0.1)]);
    }

    #[test]
    fn preset_replaces_whole_config() {
        let presets = KeyPresetSet::builtin();
        let mut cfg = ChromaKeyConfig::default();
        assert!(KeyControl::Preset(1).apply(&mut cfg, &presets));
        assert_eq!(Some(&cfg), presets.get("blue"));
        assert!(!KeyControl::Preset(99).apply(&mut cfg, &presets));
        assert_eq!(Some(&cfg), presets.get("blue"));
    }

    #[test]
    fn poll_into_updates_shared_config() {
        let mut rx = OscKeyReceiver::bind("127.0.0.1:0", KeyPresetSet::builtin()).unwrap();
        let to = rx.local_addr().unwrap();
        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();

        let bytes = encoder::encode(&msg("/key/similarity", vec![OscType::Float(0.2)])).unwrap();
        tx.send_to(&bytes, to).unwrap();
        let bytes = encoder::encode(&msg("/key/r", vec![OscType::Float(0.5)])).unwrap();
        tx.send_to(&bytes, to).unwrap();

        let shared = SharedKeyConfig::default();
        let mut applied = 0;
        for _ in 0..100 {
            applied += rx.poll_into(&shared);
            if applied == 2 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(applied, 2);
        let cfg = shared.get();
        assert_eq!(cfg.similarity, 0.2);
        assert_eq!(cfg.key_color[0], 0.5);
    }
}
