//! Probe vendor commands

use riotee_core::probe::{GpioDir, Probe, ProbeVariant};
use riotee_core::transport::ProbeLink;

pub fn run_version(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut probe = Probe::new(link, variant);
    let version = probe.firmware_version()?;
    println!("{} firmware {}", variant, version);
    Ok(())
}

pub fn run_power(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
    on: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    Probe::new(link, variant).target_power(on)?;
    Ok(())
}

pub fn run_bypass(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
    on: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    Probe::new(link, variant)
        .bypass(on)
        .map_err(|e| format!("Bypass not available on {}: {}", variant, e))?;
    Ok(())
}

pub fn run_gpio_set(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
    pin: u8,
    high: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    Probe::new(link, variant).gpio_set(pin, high)?;
    Ok(())
}

pub fn run_gpio_get(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
    pin: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let high = Probe::new(link, variant).gpio_get(pin)?;
    println!("GPIO {}: {}", pin, if high { "high" } else { "low" });
    Ok(())
}

pub fn run_gpio_dir(
    link: &mut dyn ProbeLink,
    variant: ProbeVariant,
    pin: u8,
    dir: GpioDir,
) -> Result<(), Box<dyn std::error::Error>> {
    Probe::new(link, variant).gpio_dir(pin, dir)?;
    Ok(())
}
