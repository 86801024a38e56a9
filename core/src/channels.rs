//! Name-keyed observation/info channels with typed write accessors.
//!
//! Channels are registered with a [`SpaceDesc`] at setup time and later
//! connected to caller-owned memory. Writing to a registered but unconnected
//! channel is a legal no-op so the simulation can publish unconditionally;
//! looking up a name that was never registered is a fatal configuration
//! error. All multi-byte values are stored little-endian.

use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::SetupError;

/// Element type stored by a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Unsigned bytes, also used for boolean flags.
    U8,
    /// Little-endian 32-bit signed integers.
    I32,
    /// Little-endian 32-bit IEEE floats.
    F32,
}

impl ElementKind {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I32 | Self::F32 => 4,
        }
    }

    /// Human-readable kind name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I32 => "i32",
            Self::F32 => "f32",
        }
    }
}

/// Declared element type and shape of a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceDesc {
    kind: ElementKind,
    shape: Vec<usize>,
}

impl SpaceDesc {
    /// Creates a descriptor with an explicit shape.
    #[must_use]
    pub fn new(kind: ElementKind, shape: Vec<usize>) -> Self {
        Self { kind, shape }
    }

    /// Creates a descriptor for a single-element channel.
    #[must_use]
    pub fn scalar(kind: ElementKind) -> Self {
        Self::new(kind, vec![1])
    }

    /// Element type stored by the channel.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Declared shape of the channel.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements implied by the shape.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Total byte length implied by the shape and element type.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.kind.size_in_bytes()
    }
}

/// Caller-owned backing memory bound to a channel.
///
/// The registry never allocates or frees channel memory; callers keep the
/// region alive for the lifetime of the environment instance.
pub type ChannelBuffer = Rc<RefCell<Vec<u8>>>;

#[derive(Clone, Debug)]
struct Channel {
    name: String,
    desc: SpaceDesc,
    memory: Option<ChannelBuffer>,
}

/// Registry mapping channel names to descriptors and connected memory.
#[derive(Clone, Debug, Default)]
pub struct ChannelSet {
    channels: Vec<Channel>,
}

impl ChannelSet {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel under a unique name.
    pub fn register(&mut self, name: &str, desc: SpaceDesc) -> Result<(), SetupError> {
        if self.position(name).is_some() {
            return Err(SetupError::DuplicateChannel {
                name: name.to_owned(),
            });
        }
        self.channels.push(Channel {
            name: name.to_owned(),
            desc,
            memory: None,
        });
        Ok(())
    }

    /// Binds caller-owned memory to a registered channel.
    ///
    /// The memory's byte length must match the registered descriptor
    /// exactly; connecting must happen before any write is expected to land.
    pub fn connect(&mut self, name: &str, memory: ChannelBuffer) -> Result<(), SetupError> {
        let index = self
            .position(name)
            .ok_or_else(|| SetupError::UnknownChannel {
                name: name.to_owned(),
            })?;
        let expected = self.channels[index].desc.byte_len();
        let found = memory.borrow().len();
        if expected != found {
            return Err(SetupError::ChannelSizeMismatch {
                name: name.to_owned(),
                expected,
                found,
            });
        }
        self.channels[index].memory = Some(memory);
        Ok(())
    }

    /// Retrieves the descriptor registered under a name.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> &SpaceDesc {
        &self.channel(name).desc
    }

    /// Reports whether a registered channel has memory connected.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered.
    #[must_use]
    pub fn is_connected(&self, name: &str) -> bool {
        self.channel(name).memory.is_some()
    }

    /// Writes one byte element. No-op when the channel is unconnected.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered, the channel does not store
    /// bytes, or the index is outside the declared shape.
    pub fn write_u8(&self, name: &str, index: usize, value: u8) {
        self.write_element(name, ElementKind::U8, index, &[value]);
    }

    /// Writes one 32-bit integer element. No-op when unconnected.
    ///
    /// # Panics
    ///
    /// Panics under the same contract violations as [`ChannelSet::write_u8`].
    pub fn write_i32(&self, name: &str, index: usize, value: i32) {
        self.write_element(name, ElementKind::I32, index, &value.to_le_bytes());
    }

    /// Writes one 32-bit float element. No-op when unconnected.
    ///
    /// # Panics
    ///
    /// Panics under the same contract violations as [`ChannelSet::write_u8`].
    pub fn write_f32(&self, name: &str, index: usize, value: f32) {
        self.write_element(name, ElementKind::F32, index, &value.to_le_bytes());
    }

    /// Runs a bulk fill over a byte channel's connected memory.
    ///
    /// The closure is skipped entirely when no memory is connected, which
    /// lets callers guard expensive fills behind the connection state.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered or the channel does not store
    /// bytes.
    pub fn fill_u8<F>(&self, name: &str, fill: F)
    where
        F: FnOnce(&mut [u8]),
    {
        let channel = self.channel(name);
        assert_eq!(
            channel.desc.kind(),
            ElementKind::U8,
            "channel `{name}` stores {}, not u8",
            channel.desc.kind().name()
        );
        if let Some(memory) = &channel.memory {
            fill(&mut memory.borrow_mut());
        }
    }

    fn write_element(&self, name: &str, kind: ElementKind, index: usize, bytes: &[u8]) {
        let channel = self.channel(name);
        assert_eq!(
            channel.desc.kind(),
            kind,
            "channel `{name}` stores {}, not {}",
            channel.desc.kind().name(),
            kind.name()
        );
        assert!(
            index < channel.desc.element_count(),
            "index {index} outside channel `{name}` shape"
        );
        if let Some(memory) = &channel.memory {
            let offset = index * kind.size_in_bytes();
            memory.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|channel| channel.name == name)
    }

    fn channel(&self, name: &str) -> &Channel {
        match self.position(name) {
            Some(index) => &self.channels[index],
            None => panic!("no channel registered under `{name}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::{ChannelBuffer, ChannelSet, ElementKind, SpaceDesc};
    use crate::SetupError;

    fn buffer(len: usize) -> ChannelBuffer {
        Rc::new(RefCell::new(vec![0; len]))
    }

    #[test]
    fn scalar_writes_land_little_endian() {
        let mut channels = ChannelSet::new();
        channels
            .register("reward", SpaceDesc::scalar(ElementKind::F32))
            .expect("register");
        let memory = buffer(4);
        channels.connect("reward", Rc::clone(&memory)).expect("connect");

        channels.write_f32("reward", 0, -1.5);
        assert_eq!(&*memory.borrow(), &(-1.5f32).to_le_bytes());
    }

    #[test]
    fn indexed_writes_respect_element_stride() {
        let mut channels = ChannelSet::new();
        channels
            .register("seeds", SpaceDesc::new(ElementKind::I32, vec![3]))
            .expect("register");
        let memory = buffer(12);
        channels.connect("seeds", Rc::clone(&memory)).expect("connect");

        channels.write_i32("seeds", 2, 997);
        let bytes = memory.borrow();
        assert_eq!(&bytes[8..12], &997i32.to_le_bytes());
        assert!(bytes[..8].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn unconnected_writes_are_no_ops() {
        let mut channels = ChannelSet::new();
        channels
            .register("done", SpaceDesc::scalar(ElementKind::U8))
            .expect("register");
        channels.write_u8("done", 0, 1);
        assert!(!channels.is_connected("done"));
    }

    #[test]
    fn fill_skips_unconnected_channels() {
        let mut channels = ChannelSet::new();
        channels
            .register("state", SpaceDesc::new(ElementKind::U8, vec![8]))
            .expect("register");
        let mut ran = false;
        channels.fill_u8("state", |_| ran = true);
        assert!(!ran);

        channels.connect("state", buffer(8)).expect("connect");
        channels.fill_u8("state", |bytes| {
            ran = true;
            assert_eq!(bytes.len(), 8);
        });
        assert!(ran);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut channels = ChannelSet::new();
        channels
            .register("rgb", SpaceDesc::new(ElementKind::U8, vec![4, 4, 3]))
            .expect("register");
        let err = channels
            .register("rgb", SpaceDesc::scalar(ElementKind::U8))
            .expect_err("duplicate");
        assert_eq!(
            err,
            SetupError::DuplicateChannel {
                name: "rgb".to_owned()
            }
        );
    }

    #[test]
    fn connecting_unknown_channels_is_rejected() {
        let mut channels = ChannelSet::new();
        let err = channels.connect("nope", buffer(1)).expect_err("unknown");
        assert_eq!(
            err,
            SetupError::UnknownChannel {
                name: "nope".to_owned()
            }
        );
    }

    #[test]
    fn connecting_wrong_sizes_is_rejected() {
        let mut channels = ChannelSet::new();
        channels
            .register("level_seed", SpaceDesc::scalar(ElementKind::I32))
            .expect("register");
        let err = channels
            .connect("level_seed", buffer(2))
            .expect_err("size mismatch");
        assert_eq!(
            err,
            SetupError::ChannelSizeMismatch {
                name: "level_seed".to_owned(),
                expected: 4,
                found: 2,
            }
        );
    }

    #[test]
    #[should_panic(expected = "no channel registered")]
    fn writing_unregistered_names_panics() {
        let channels = ChannelSet::new();
        channels.write_u8("ghost", 0, 1);
    }

    #[test]
    #[should_panic(expected = "stores f32, not i32")]
    fn kind_mismatched_writes_panic() {
        let mut channels = ChannelSet::new();
        channels
            .register("reward", SpaceDesc::scalar(ElementKind::F32))
            .expect("register");
        channels.write_i32("reward", 0, 1);
    }

    #[test]
    #[should_panic(expected = "outside channel")]
    fn out_of_shape_indices_panic() {
        let mut channels = ChannelSet::new();
        channels
            .register("done", SpaceDesc::scalar(ElementKind::U8))
            .expect("register");
        channels.write_u8("done", 1, 0);
    }

    #[test]
    fn descriptor_reports_shape_and_bytes() {
        let desc = SpaceDesc::new(ElementKind::U8, vec![64, 64, 3]);
        assert_eq!(desc.element_count(), 12_288);
        assert_eq!(desc.byte_len(), 12_288);
        let desc = SpaceDesc::new(ElementKind::F32, vec![2, 2]);
        assert_eq!(desc.byte_len(), 16);
    }
}
