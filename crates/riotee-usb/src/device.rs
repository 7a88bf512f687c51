//! Riotee probe USB device
//!
//! The probe enumerates as a CMSIS-DAP v2 device: one vendor-class interface
//! with a bulk OUT endpoint for commands and a bulk IN endpoint for
//! responses. Each command is one packet out followed by one packet in.

use nusb::transfer::{Direction, EndpointType, Queue, RequestBuffer};
use nusb::{Device, Interface};
use riotee_core::error::{Error as CoreError, Result as CoreResult};
use riotee_core::probe::ProbeVariant;
use riotee_core::protocol::{Request, DAP_PACKET_SIZE, RIOTEE_USB_VENDOR};
use riotee_core::transport::{vendor_exchange, CommandTransport, DapTransport};

use crate::error::{Result, UsbError};

/// USB interface class of CMSIS-DAP v2
const VENDOR_CLASS: u8 = 0xFF;

/// Configuration options for opening a probe
#[derive(Debug, Clone, Default)]
pub struct UsbConfig {
    /// USB serial number (substring) to match; None = the only probe present
    pub serial: Option<String>,
}

/// A Riotee probe connected over USB
pub struct UsbProbe {
    /// USB device handle
    _device: Device,
    /// Claimed CMSIS-DAP interface
    interface: Interface,
    /// IN endpoint address
    in_ep: u8,
    /// OUT endpoint address
    out_ep: u8,
    /// Hardware variant
    variant: ProbeVariant,
    /// Serial number, if reported
    serial: Option<String>,
}

impl UsbProbe {
    /// Open the only connected probe
    pub fn open() -> Result<Self> {
        Self::open_with_config(&UsbConfig::default())
    }

    /// Open a probe matching `config`
    pub fn open_with_config(config: &UsbConfig) -> Result<Self> {
        let devices = Self::find_devices(config.serial.as_deref())?;

        if devices.is_empty() {
            return Err(UsbError::DeviceNotFound);
        }
        if devices.len() > 1 && config.serial.is_none() {
            return Err(UsbError::MultipleDevicesFound(devices.len()));
        }

        let info = &devices[0];
        log::info!("Opening {}", info);

        let device = info.info.open().map_err(UsbError::OpenFailed)?;
        let interface =
            device
                .claim_interface(info.interface_num)
                .map_err(|source| UsbError::ClaimFailed {
                    interface: info.interface_num,
                    source,
                })?;

        Ok(Self {
            _device: device,
            interface,
            in_ep: info.in_ep,
            out_ep: info.out_ep,
            variant: info.variant,
            serial: info.serial.clone(),
        })
    }

    /// Find all connected Riotee probes
    fn find_devices(serial_filter: Option<&str>) -> Result<Vec<UsbProbeInfo>> {
        let mut devices = Vec::new();

        for dev_info in nusb::list_devices().map_err(UsbError::ListFailed)? {
            if dev_info.vendor_id() != RIOTEE_USB_VENDOR {
                continue;
            }
            let Some(variant) = ProbeVariant::from_product_id(dev_info.product_id()) else {
                continue;
            };

            if let Some(filter) = serial_filter {
                match dev_info.serial_number() {
                    Some(serial) if serial.contains(filter) => {}
                    _ => continue,
                }
            }

            let Some(iface_info) = dev_info.interfaces().find(|i| {
                i.class() == VENDOR_CLASS
                    && i.interface_string().map_or(true, |s| s.contains("CMSIS-DAP"))
            }) else {
                log::debug!(
                    "{:04X}:{:04X} has no CMSIS-DAP interface",
                    dev_info.vendor_id(),
                    dev_info.product_id()
                );
                continue;
            };
            let interface_num = iface_info.interface_number();

            // Endpoint addresses are only visible on an opened device
            let device = match dev_info.open() {
                Ok(d) => d,
                Err(e) => {
                    log::debug!("Failed to open device for endpoint discovery: {}", e);
                    continue;
                }
            };

            let mut in_ep = None;
            let mut out_ep = None;
            if let Ok(config) = device.active_configuration() {
                for iface in config.interface_alt_settings() {
                    if iface.interface_number() != interface_num {
                        continue;
                    }
                    for ep in iface.endpoints() {
                        if ep.transfer_type() != EndpointType::Bulk {
                            continue;
                        }
                        match ep.direction() {
                            Direction::In if in_ep.is_none() => in_ep = Some(ep.address()),
                            Direction::Out if out_ep.is_none() => out_ep = Some(ep.address()),
                            _ => {}
                        }
                    }
                    break;
                }
            }

            if let (Some(in_ep), Some(out_ep)) = (in_ep, out_ep) {
                devices.push(UsbProbeInfo {
                    info: dev_info.clone(),
                    bus: dev_info.bus_number(),
                    address: dev_info.device_address(),
                    serial: dev_info.serial_number().map(|s| s.to_string()),
                    variant,
                    interface_num,
                    in_ep,
                    out_ep,
                });
            }
        }

        Ok(devices)
    }

    /// List all connected Riotee probes
    pub fn list_devices() -> Result<Vec<UsbProbeInfo>> {
        Self::find_devices(None)
    }

    /// Hardware variant of the opened probe
    pub fn variant(&self) -> ProbeVariant {
        self.variant
    }

    /// Serial number of the opened probe
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Send a packet to the probe
    fn write_packet(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > DAP_PACKET_SIZE {
            return Err(UsbError::PacketTooLarge {
                len: data.len(),
                max: DAP_PACKET_SIZE,
            });
        }

        let mut queue: Queue<Vec<u8>> = self.interface.bulk_out_queue(self.out_ep);
        queue.submit(data.to_vec());

        let completion = futures_lite::future::block_on(async { queue.next_complete().await });
        completion.status.map_err(UsbError::TransferFailed)?;

        log::trace!("USB write {:02X?}", data);
        Ok(())
    }

    /// Read a packet from the probe
    fn read_packet(&mut self) -> Result<Vec<u8>> {
        let mut queue: Queue<RequestBuffer> = self.interface.bulk_in_queue(self.in_ep);
        queue.submit(RequestBuffer::new(DAP_PACKET_SIZE));

        let completion = futures_lite::future::block_on(async { queue.next_complete().await });
        completion.status.map_err(UsbError::TransferFailed)?;

        log::trace!("USB read {:02X?}", completion.data);
        Ok(completion.data)
    }
}

impl DapTransport for UsbProbe {
    fn exchange(&mut self, request: &[u8]) -> CoreResult<Vec<u8>> {
        self.write_packet(request)
            .and_then(|_| self.read_packet())
            .map_err(|e| {
                log::error!("CMSIS-DAP exchange failed: {}", e);
                CoreError::Transport
            })
    }
}

impl CommandTransport for UsbProbe {
    fn vendor(&mut self, request: Request, payload: &[u8]) -> CoreResult<Vec<u8>> {
        vendor_exchange(self, request, payload)
    }
}

/// Information about a connected probe
#[derive(Debug, Clone)]
pub struct UsbProbeInfo {
    /// nusb device info
    pub(crate) info: nusb::DeviceInfo,
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// Device serial number (if available)
    pub serial: Option<String>,
    /// Hardware variant
    pub variant: ProbeVariant,
    /// Interface number
    pub(crate) interface_num: u8,
    /// IN endpoint address
    pub(crate) in_ep: u8,
    /// OUT endpoint address
    pub(crate) out_ep: u8,
}

impl std::fmt::Display for UsbProbeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at bus {} address {}",
            self.variant, self.bus, self.address
        )?;
        if let Some(ref serial) = self.serial {
            write!(f, " serial={}", serial)?;
        }
        Ok(())
    }
}

/// Parse probe options from key-value pairs
///
/// Supported options:
/// - `serial=<serial>` - USB serial number (substring) to match
pub fn parse_options(options: &[(&str, &str)]) -> Result<UsbConfig> {
    let mut config = UsbConfig::default();

    for (key, value) in options {
        match *key {
            "serial" => {
                config.serial = Some(value.to_string());
            }
            _ => {
                return Err(UsbError::InvalidParameter(format!(
                    "Unknown option: {}",
                    key
                )));
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("serial", "E66038")]).unwrap();
        assert_eq!(config.serial.as_deref(), Some("E66038"));

        assert!(parse_options(&[]).unwrap().serial.is_none());
        assert!(matches!(
            parse_options(&[("speed", "1")]),
            Err(UsbError::InvalidParameter(_))
        ));
    }
}
