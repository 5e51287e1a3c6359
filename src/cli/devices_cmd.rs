//! Devices command handler

use crate::domain::recording::CaptureSourceKind;
use crate::infrastructure::CpalCapture;

use super::presenter::Presenter;

/// Show which device backs each capture source
pub fn handle_devices_command(capture: &CpalCapture, presenter: &Presenter) {
    for kind in CaptureSourceKind::ALL {
        let device = capture
            .device_name(kind)
            .unwrap_or_else(|| "(unavailable)".to_string());
        presenter.key_value(&format!("{} ({})", kind.as_str(), kind.label()), &device);
    }
}
