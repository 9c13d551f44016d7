use std::fmt::Display;
use std::sync::Arc;

/// Type alias used to represent [`Device`] IDs, which are unique among devices of the same type and, in multi-host
/// environments, are also unique across all devices and all hosts.
pub type DeviceId = usize;

/// Type alias used to represent the index of the process (host) that owns a [`Device`].
pub type ProcessIndex = usize;

/// Opaque handle to a compute device owned by an external device registry.
///
/// A `Device` separates global identity ([`DeviceId`]) from host ownership ([`ProcessIndex`]), so that the same
/// sharding metadata can describe both local and remote shards. Two handles compare equal exactly when they refer to
/// the same registry entry. Shardings hold these handles weakly: they never manage device state or lifetime, and the
/// registry is responsible for keeping its ordering stable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Device {
    id: DeviceId,
    process_index: ProcessIndex,
}

impl Device {
    /// Creates a device handle.
    pub fn new(id: DeviceId, process_index: ProcessIndex) -> Self {
        Self { id, process_index }
    }

    /// Globally unique ID of this device.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Index of the process that this device belongs to (i.e., is _addressable_ from).
    pub fn process_index(&self) -> ProcessIndex {
        self.process_index
    }
}

/// Ordered list of [`Device`]s that a sharding assigns shards to.
///
/// The list length defines the shard count and its order is the canonical shard order: entry *i* of every
/// per-shard result computed against a sharding corresponds to `devices()[i]`. The same device may appear more than
/// once, in which case it hosts more than one shard index; no operation in this crate special-cases duplicates
/// beyond standard iteration.
///
/// Device lists are immutable and cheap to clone (the underlying storage is shared), matching how a single sharding
/// is commonly referenced by many arrays at once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceList {
    devices: Arc<Vec<Device>>,
}

impl DeviceList {
    /// Creates a device list from devices in canonical shard order.
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices: Arc::new(devices) }
    }

    /// Returns the devices in this list in canonical shard order.
    pub fn devices(&self) -> &[Device] {
        self.devices.as_slice()
    }

    /// Returns the number of devices in this list, which is also the shard count of any sharding built over it.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` iff this list contains no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Returns the devices in this list that belong to the given `process_index` (i.e., the devices whose shards are
    /// _addressable_ when executing on that host). Addressability never affects shard computation; it is metadata
    /// for runtime layers that bind shards to local buffers.
    pub fn addressable_devices(&self, process_index: ProcessIndex) -> Vec<Device> {
        self.devices.iter().copied().filter(|device| device.process_index() == process_index).collect()
    }

    /// Returns `true` if any two devices in this list belong to different processes.
    pub fn is_multi_process(&self) -> bool {
        let mut seen = None;
        for device in self.devices.iter() {
            match seen {
                None => seen = Some(device.process_index()),
                Some(process_index) if process_index != device.process_index() => return true,
                _ => {}
            }
        }
        false
    }
}

impl Display for DeviceList {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "[")?;
        for (device_index, device) in self.devices.iter().enumerate() {
            if device_index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{}", device.id())?;
        }
        write!(formatter, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_accessors() {
        let device = Device::new(3, 1);
        assert_eq!(device.id(), 3);
        assert_eq!(device.process_index(), 1);
        assert_eq!(device, Device::new(3, 1));
        assert_ne!(device, Device::new(3, 0));
    }

    #[test]
    fn test_device_list_allows_duplicates() {
        let device = Device::new(0, 0);
        let devices = DeviceList::new(vec![device, device, device]);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices.devices(), &[device, device, device]);
    }

    #[test]
    fn test_device_list_addressable_devices() {
        let devices = DeviceList::new(vec![Device::new(0, 0), Device::new(1, 0), Device::new(2, 1)]);
        assert_eq!(devices.addressable_devices(0), vec![Device::new(0, 0), Device::new(1, 0)]);
        assert_eq!(devices.addressable_devices(1), vec![Device::new(2, 1)]);
        assert!(devices.addressable_devices(42).is_empty());
    }

    #[test]
    fn test_device_list_is_multi_process() {
        let single = DeviceList::new(vec![Device::new(0, 0), Device::new(1, 0)]);
        assert!(!single.is_multi_process());
        let multi = DeviceList::new(vec![Device::new(0, 0), Device::new(1, 1)]);
        assert!(multi.is_multi_process());
    }

    #[test]
    fn test_device_list_display() {
        let devices = DeviceList::new(vec![Device::new(0, 0), Device::new(2, 0), Device::new(2, 0)]);
        assert_eq!(devices.to_string(), "[0, 2, 2]");
    }
}
