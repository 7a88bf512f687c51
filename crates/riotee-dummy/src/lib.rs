//! riotee-dummy - In-memory Riotee probe emulator for testing
//!
//! [`DummyProbe`] answers raw CMSIS-DAP packets the way the probe firmware
//! does for the vendor command set, with an emulated MSP430 behind the SBW
//! commands. It is useful for testing and development without hardware.
//! Standard CMSIS-DAP (SWD) commands are not emulated and fail.

use std::collections::BTreeMap;

use riotee_core::error::Result;
use riotee_core::frame;
use riotee_core::probe::ProbeVariant;
use riotee_core::protocol::{
    Request, BYPASS_ON, DAP_ERROR, DAP_OK, ID_DAP_INVALID, IOSET_IN, IOSET_OUT_HIGH,
    IOSET_OUT_LOW, TARGET_POWER_ON,
};
use riotee_core::transport::{vendor_exchange, CommandTransport, DapTransport};

/// Number of emulated probe GPIOs
pub const GPIO_COUNT: usize = 16;

/// Configuration for the dummy probe
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Hardware variant to emulate
    pub variant: ProbeVariant,
    /// Firmware version string reported by VERSION
    pub firmware_version: String,
    /// Word address whose read-back is corrupted (fault injection)
    pub corrupt: Option<u32>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            variant: ProbeVariant::Probe,
            firmware_version: "1.1.0".to_string(),
            corrupt: None,
        }
    }
}

/// State of one emulated GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// Floating input sampling the given level
    Input(bool),
    /// Output driving the given level
    Output(bool),
}

/// Dummy Riotee probe
///
/// Emulates the vendor command set and MSP430 memory for testing purposes.
pub struct DummyProbe {
    config: DummyConfig,
    memory: BTreeMap<u32, u16>,
    sbw_connected: bool,
    halted: bool,
    resets: usize,
    target_power: bool,
    bypass: bool,
    gpio: [PinState; GPIO_COUNT],
    history: Vec<Request>,
}

impl DummyProbe {
    /// Create a new dummy probe with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            memory: BTreeMap::new(),
            sbw_connected: false,
            halted: false,
            resets: 0,
            target_power: false,
            bypass: false,
            gpio: [PinState::Input(false); GPIO_COUNT],
            history: Vec::new(),
        }
    }

    /// Create a new dummy probe with default configuration (Riotee Probe)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Emulated hardware variant
    pub fn variant(&self) -> ProbeVariant {
        self.config.variant
    }

    /// MSP430 word at `addr` (erased memory reads 0xFFFF)
    pub fn word(&self, addr: u32) -> u16 {
        self.memory.get(&addr).copied().unwrap_or(0xFFFF)
    }

    /// Whether SBW is attached
    pub fn sbw_connected(&self) -> bool {
        self.sbw_connected
    }

    /// Whether the MSP430 CPU is halted
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Number of MSP430 resets issued
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Whether the target supply is on
    pub fn target_power(&self) -> bool {
        self.target_power
    }

    /// Whether the current-measurement bypass is on
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// State of GPIO `pin`
    pub fn pin(&self, pin: u8) -> Option<PinState> {
        self.gpio.get(pin as usize).copied()
    }

    /// Set the level an input pin samples
    pub fn drive_input(&mut self, pin: u8, level: bool) {
        if let Some(PinState::Input(l)) = self.gpio.get_mut(pin as usize) {
            *l = level;
        }
    }

    /// Vendor requests received so far, in order
    pub fn history(&self) -> &[Request] {
        &self.history
    }

    fn read_word(&self, addr: u32) -> u16 {
        let word = self.word(addr);
        if self.config.corrupt == Some(addr) {
            word ^ 0x0001
        } else {
            word
        }
    }

    fn handle_sbw_write(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let packet = frame::decode_write(payload).ok()?;
        log::trace!(
            "dummy: write {} words at 0x{:08X}",
            packet.len(),
            packet.address()
        );
        for (addr, word) in packet.iter() {
            self.memory.insert(addr, word);
        }
        Some(Vec::new())
    }

    fn handle_sbw_read(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        if payload.len() < frame::READ_REQUEST_LEN {
            return None;
        }
        let addr = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let count = payload[4] as u32;
        let mut data = Vec::with_capacity(2 * count as usize);
        for i in 0..count {
            data.extend_from_slice(&self.read_word(addr + 2 * i).to_le_bytes());
        }
        Some(data)
    }

    fn handle_gpio_set(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let (&pin, &state) = (payload.first()?, payload.get(1)?);
        let slot = self.gpio.get_mut(pin as usize)?;
        *slot = match state {
            IOSET_OUT_LOW => PinState::Output(false),
            IOSET_OUT_HIGH => PinState::Output(true),
            IOSET_IN => PinState::Input(false),
            _ => return None,
        };
        Some(Vec::new())
    }

    fn handle_gpio_get(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let level = match self.gpio.get(*payload.first()? as usize)? {
            PinState::Input(l) | PinState::Output(l) => *l,
        };
        Some(vec![level as u8])
    }

    /// Execute a vendor request; `None` means the firmware reports an error
    fn handle_vendor(&mut self, request: Request, payload: &[u8]) -> Option<Vec<u8>> {
        let needs_sbw = matches!(
            request,
            Request::SbwReset
                | Request::SbwHalt
                | Request::SbwResume
                | Request::SbwRead
                | Request::SbwWrite
        );
        if needs_sbw && !self.sbw_connected {
            log::debug!("dummy: {} without SBW connection", request);
            return None;
        }

        let variant = self.config.variant;
        match request {
            Request::Version => {
                let mut v = self.config.firmware_version.as_bytes().to_vec();
                v.push(0);
                Some(v)
            }
            Request::Power => {
                self.target_power = *payload.first()? == TARGET_POWER_ON;
                Some(Vec::new())
            }
            Request::SbwConnect => {
                self.sbw_connected = true;
                Some(Vec::new())
            }
            Request::SbwDisconnect => {
                self.sbw_connected = false;
                self.halted = false;
                Some(Vec::new())
            }
            Request::SbwReset => {
                self.resets += 1;
                Some(Vec::new())
            }
            Request::SbwHalt => {
                self.halted = true;
                Some(Vec::new())
            }
            Request::SbwResume => {
                self.halted = false;
                Some(Vec::new())
            }
            Request::SbwWrite => self.handle_sbw_write(payload),
            Request::SbwRead => self.handle_sbw_read(payload),
            Request::GpioSet if variant == ProbeVariant::Probe => self.handle_gpio_set(payload),
            Request::GpioGet if variant == ProbeVariant::Probe => self.handle_gpio_get(payload),
            Request::Bypass if variant == ProbeVariant::Board => {
                self.bypass = *payload.first()? == BYPASS_ON;
                Some(Vec::new())
            }
            _ => None,
        }
    }
}

impl DapTransport for DummyProbe {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let Some(&id) = request.first() else {
            return Ok(vec![ID_DAP_INVALID]);
        };

        let Some(vendor) = Request::from_id(id) else {
            log::debug!("dummy: CMSIS-DAP command 0x{:02X} not emulated", id);
            return Ok(vec![ID_DAP_INVALID]);
        };

        self.history.push(vendor);
        let mut rsp = vec![id];
        match self.handle_vendor(vendor, &request[1..]) {
            Some(data) => {
                rsp.push(DAP_OK);
                rsp.extend_from_slice(&data);
            }
            None => rsp.push(DAP_ERROR),
        }
        Ok(rsp)
    }
}

impl CommandTransport for DummyProbe {
    fn vendor(&mut self, request: Request, payload: &[u8]) -> Result<Vec<u8>> {
        vendor_exchange(self, request, payload)
    }
}

/// Parse dummy options from key-value pairs
///
/// Supported options:
/// - `variant=<probe|board>` - Hardware variant to emulate
/// - `corrupt=<addr>` - Corrupt read-back of the word at `addr` (hex with 0x)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "variant" => {
                config.variant = match *value {
                    "probe" => ProbeVariant::Probe,
                    "board" => ProbeVariant::Board,
                    _ => return Err(format!("Unknown variant: {}", value)),
                };
            }
            "corrupt" => {
                let addr = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => value.parse(),
                }
                .map_err(|e| format!("Invalid corrupt address '{}': {}", value, e))?;
                config.corrupt = Some(addr);
            }
            _ => return Err(format!("Unknown option: {}", key)),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riotee_core::error::Error;
    use riotee_core::image::HexImage;
    use riotee_core::probe::{GpioDir, Probe};
    use riotee_core::program::ProgressFraction;
    use riotee_core::target::{Msp430, Target};

    fn firmware(words: usize) -> HexImage {
        let data: Vec<u8> = (0..2 * words).map(|i| (i * 13) as u8).collect();
        HexImage::from_blocks(vec![(0x4400, data), (0xFF80, vec![0x00, 0x44])]).unwrap()
    }

    #[test]
    fn test_program_msp430() {
        let image = firmware(500);
        let mut dummy = DummyProbe::new_default();
        let mut last = 0.0;
        {
            let mut msp = Msp430::open(&mut dummy).unwrap();
            let stats = msp
                .program(&image, true, &mut |p: ProgressFraction| last = p.as_f64())
                .unwrap();
            assert_eq!(stats.bytes_written, 1002);
        }
        assert_eq!(last, 1.0);
        assert!(!dummy.sbw_connected());
        assert!(!dummy.halted());
        for seg in image.segments() {
            for (addr, word) in seg.words() {
                assert_eq!(dummy.word(addr), word);
            }
        }
        assert_eq!(dummy.word(0xFF80), 0x4400);
    }

    #[test]
    fn test_verify_failure_address() {
        let image = firmware(100);
        let mut dummy = DummyProbe::new(DummyConfig {
            corrupt: Some(0x4400 + 2 * 40),
            ..Default::default()
        });

        let err = {
            let mut msp = Msp430::open(&mut dummy).unwrap();
            msp.program(&image, true, &mut |_| {}).unwrap_err()
        };
        // Word 40 lives in the second 29-word packet
        assert_eq!(err, Error::VerifyFailed { addr: 0x4400 + 2 * 29 });
        assert_eq!(err.to_string(), "verification failed at 0x0000443A");

        let history = dummy.history();
        assert_eq!(history.last(), Some(&Request::SbwDisconnect));
        assert!(!history.contains(&Request::SbwResume));
        assert_eq!(
            history.iter().filter(|r| **r == Request::SbwWrite).count(),
            2
        );
    }

    #[test]
    fn test_program_without_verify_ignores_corruption() {
        let image = firmware(100);
        let mut dummy = DummyProbe::new(DummyConfig {
            corrupt: Some(0x4400),
            ..Default::default()
        });
        let mut msp = Msp430::open(&mut dummy).unwrap();
        let stats = msp.program(&image, false, &mut |_| {}).unwrap();
        assert_eq!(stats.packets_verified, 0);
    }

    #[test]
    fn test_sbw_requires_connect() {
        let mut dummy = DummyProbe::new_default();
        assert_eq!(dummy.halt(), Err(Error::ProbeStatus(DAP_ERROR)));
        dummy.connect().unwrap();
        dummy.halt().unwrap();
        assert!(dummy.halted());
    }

    #[test]
    fn test_word_access() {
        let mut dummy = DummyProbe::new_default();
        let mut msp = Msp430::open(&mut dummy).unwrap();
        msp.write_words(0x1800, &[0xBEEF, 0xCAFE]).unwrap();
        assert_eq!(msp.read_words(0x1800, 3).unwrap(), vec![0xBEEF, 0xCAFE, 0xFFFF]);
        msp.reset().unwrap();
        drop(msp);
        assert_eq!(dummy.resets(), 1);
    }

    #[test]
    fn test_probe_gpio() {
        let mut dummy = DummyProbe::new_default();
        dummy.drive_input(2, true);
        {
            let mut probe = Probe::new(&mut dummy, ProbeVariant::Probe);
            assert!(probe.gpio_get(2).unwrap());
            probe.gpio_set(3, true).unwrap();
            probe.gpio_dir(4, GpioDir::Out).unwrap();
            probe.target_power(true).unwrap();
            assert_eq!(probe.firmware_version().unwrap(), "1.1.0");
        }
        assert_eq!(dummy.pin(3), Some(PinState::Output(true)));
        assert_eq!(dummy.pin(4), Some(PinState::Output(false)));
        assert!(dummy.target_power());
    }

    #[test]
    fn test_board_bypass() {
        let mut dummy = DummyProbe::new(DummyConfig {
            variant: ProbeVariant::Board,
            ..Default::default()
        });
        {
            let mut probe = Probe::new(&mut dummy, ProbeVariant::Board);
            probe.bypass(true).unwrap();
        }
        assert!(dummy.bypass());
        // Firmware of the board rejects GPIO requests
        assert_eq!(
            dummy.vendor(Request::GpioGet, &[0]),
            Err(Error::ProbeStatus(DAP_ERROR))
        );
    }

    #[test]
    fn test_standard_commands_not_emulated() {
        let mut dummy = DummyProbe::new_default();
        // DAP_Info
        assert_eq!(dummy.exchange(&[0x00, 0x01]).unwrap(), vec![ID_DAP_INVALID]);
        assert!(dummy.history().is_empty());
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("variant", "board"), ("corrupt", "0x4410")]).unwrap();
        assert_eq!(config.variant, ProbeVariant::Board);
        assert_eq!(config.corrupt, Some(0x4410));
        assert!(parse_options(&[("variant", "other")]).is_err());
        assert!(parse_options(&[("foo", "1")]).is_err());
    }
}
