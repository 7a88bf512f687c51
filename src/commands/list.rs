//! List command implementation

use crate::probes;

/// List probe backends and, with USB support, connected probes
pub fn list_probes() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", probes::probe_help());

    #[cfg(feature = "usb")]
    {
        let devices = riotee_usb::UsbProbe::list_devices()?;
        println!();
        if devices.is_empty() {
            println!("No probes connected");
        }
        for dev in &devices {
            println!("  {}", dev);
        }
    }

    Ok(())
}
