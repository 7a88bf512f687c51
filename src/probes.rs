//! Probe registration and dispatch
//!
//! Probe backends are feature-gated. A probe is selected with a string of
//! the form `name` or `name:option1=value1,option2=value2`.
//!
//! The MSP430 and the probe's own functions go through the vendor command
//! link opened by [`with_probe`]. The nRF52 is attached through probe-rs,
//! which claims the probe itself, so [`with_target`] routes it separately.

use riotee_core::probe::ProbeVariant;
use riotee_core::target::{Msp430, Target, TargetKind};
use riotee_core::transport::ProbeLink;

/// Backend used when neither `--probe` nor the config file names one
pub const DEFAULT_PROBE: &str = "usb";

/// Information about a probe backend
pub struct ProbeInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all probe backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_probes() -> Vec<ProbeInfo> {
    let mut probes = Vec::new();

    #[cfg(feature = "usb")]
    probes.push(ProbeInfo {
        name: "usb",
        description: "Riotee Probe / Riotee Board over USB (serial=<substring>)",
    });

    #[cfg(feature = "dummy")]
    probes.push(ProbeInfo {
        name: "dummy",
        description: "In-memory probe emulator (variant=<probe|board>,corrupt=<addr>)",
    });

    probes
}

/// Generate help text listing all probe backends
pub fn probe_help() -> String {
    let probes = available_probes();

    if probes.is_empty() {
        return "No probe backends available (recompile with probe features enabled)".to_string();
    }

    let mut help = String::from("Available probes:\n");
    for p in &probes {
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Execute a function with the specified probe
///
/// The closure receives the opened link and its hardware variant.
#[allow(unused_variables)]
pub fn with_probe<F>(probe: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn ProbeLink, ProbeVariant) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_probe_string(probe);

    match name {
        #[cfg(feature = "usb")]
        "usb" => {
            use riotee_usb::{parse_options, UsbProbe};

            let config =
                parse_options(&options).map_err(|e| format!("Invalid usb parameters: {}", e))?;

            log::info!("Opening USB probe...");
            let mut link = UsbProbe::open_with_config(&config).map_err(|e| {
                format!(
                    "Failed to open probe: {}\n\
                     Make sure the probe is connected and you have permissions.",
                    e
                )
            })?;
            let variant = link.variant();
            f(&mut link, variant)
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use riotee_dummy::{parse_options, DummyProbe};

            let config =
                parse_options(&options).map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            let mut link = DummyProbe::new(config);
            let variant = link.variant();
            f(&mut link, variant)
        }

        _ => Err(unknown_probe_error(name)),
    }
}

/// Execute a function with the selected MCU attached through `probe`
///
/// `swd_clock_khz` only applies to the nRF52.
pub fn with_target<F>(
    probe: &str,
    kind: TargetKind,
    swd_clock_khz: Option<u32>,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn Target) -> Result<(), Box<dyn std::error::Error>>,
{
    log::debug!("Attaching to {}", kind);
    match kind {
        TargetKind::Msp430 => with_probe(probe, |link, _| {
            let mut target = Msp430::open(link)?;
            f(&mut target)
        }),
        TargetKind::Nrf52 => with_nrf52(probe, swd_clock_khz, f),
    }
}

#[allow(unused_variables)]
fn with_nrf52<F>(
    probe: &str,
    swd_clock_khz: Option<u32>,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn Target) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_probe_string(probe);

    match name {
        #[cfg(feature = "usb")]
        "usb" => {
            use riotee_nrf52::{Nrf52, Nrf52Config};

            let usb = riotee_usb::parse_options(&options)
                .map_err(|e| format!("Invalid usb parameters: {}", e))?;
            let config = Nrf52Config {
                serial: usb.serial,
                speed_khz: swd_clock_khz,
                ..Default::default()
            };

            log::info!("Attaching to nRF52 through probe-rs...");
            let mut target =
                Nrf52::open(&config).map_err(|e| format!("Failed to attach to nRF52: {}", e))?;
            f(&mut target)
        }

        #[cfg(feature = "dummy")]
        "dummy" => Err("The dummy probe does not emulate SWD; use it with --device msp430".into()),

        _ => Err(unknown_probe_error(name)),
    }
}

/// Parse a probe string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_probe_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_probe_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown probe: {}\n\n", name);
    msg.push_str(&probe_help());
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_string() {
        assert_eq!(parse_probe_string("usb"), ("usb", vec![]));
        assert_eq!(
            parse_probe_string("dummy:variant=board,corrupt=0x4400"),
            ("dummy", vec![("variant", "board"), ("corrupt", "0x4400")])
        );
    }

    #[test]
    fn test_unknown_probe() {
        let err = with_probe("jlink", |_, _| Ok(())).unwrap_err();
        assert!(err.to_string().starts_with("Unknown probe: jlink"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_dispatch() {
        let mut seen = None;
        with_probe("dummy:variant=board", |_, variant| {
            seen = Some(variant);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, Some(ProbeVariant::Board));

        assert!(with_probe("dummy:variant=jtag", |_, _| Ok(())).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_target_dispatch() {
        let mut halted = false;
        with_target("dummy", TargetKind::Msp430, None, |target| {
            target.halt()?;
            halted = true;
            Ok(())
        })
        .unwrap();
        assert!(halted);

        let err = with_target("dummy", TargetKind::Nrf52, Some(1000), |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("does not emulate SWD"));
    }

    #[test]
    fn test_unknown_probe_for_each_target() {
        for kind in [TargetKind::Msp430, TargetKind::Nrf52] {
            let err = with_target("jlink", kind, None, |_| Ok(())).unwrap_err();
            assert!(err.to_string().starts_with("Unknown probe: jlink"));
        }
    }
}
