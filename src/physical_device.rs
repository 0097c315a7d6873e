use ash::vk::{self, PhysicalDeviceType, QueueFlags};

use crate::{
    driver::Driver,
    error::{BootstrapError, Result},
    instance::InstanceGuard,
};

/// The parts of a physical device's properties used to rank it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: PhysicalDeviceType,
    pub api_version: u32,
    /// Flags of each queue family, indexed by family.
    pub queue_family_flags: Vec<QueueFlags>,
}

impl PhysicalDeviceInfo {
    pub fn queue_family_supports(&self, flags: QueueFlags) -> bool {
        self.queue_family_flags
            .iter()
            .any(|family| family.contains(flags))
    }

    /// higher is better
    pub fn score(&self) -> u32 {
        let mut score = match self.device_type {
            PhysicalDeviceType::DISCRETE_GPU => 100,
            PhysicalDeviceType::INTEGRATED_GPU => 10,
            _ => 1,
        };
        // check if we have dedicated transfer queues
        if self.queue_family_supports(QueueFlags::TRANSFER) {
            score += 1;
        }
        score
    }
}

/// Queries the physical devices available on this machine and returns the graphics capable
/// ones in order of preference.
pub fn query_physical_devices<D: Driver>(
    instance: &InstanceGuard<D>,
) -> Result<Vec<PhysicalDeviceInfo>> {
    let physical_devices = instance
        .get_driver()
        .physical_devices(instance.handle())
        .map_err(|code| BootstrapError::DriverQuery {
            query: "vkEnumeratePhysicalDevices",
            code,
        })?;
    Ok(rank(physical_devices))
}

fn rank(physical_devices: Vec<PhysicalDeviceInfo>) -> Vec<PhysicalDeviceInfo> {
    let mut physical_devices = physical_devices
        .into_iter()
        .filter(|pd| pd.queue_family_supports(QueueFlags::GRAPHICS))
        .collect::<Vec<_>>();
    // stable, so equal scores keep driver order
    physical_devices.sort_by_key(|pd| std::cmp::Reverse(pd.score()));
    physical_devices
}

impl std::fmt::Display for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:?}, Vulkan {}.{}.{})",
            self.name,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        config::{AppConfig, AppVersion},
        driver::fake::FakeDriver,
        instance::InstanceBuilder,
        requirements::ResolvedConfig,
    };

    fn device(name: &str, device_type: PhysicalDeviceType, families: &[QueueFlags]) -> PhysicalDeviceInfo {
        PhysicalDeviceInfo {
            name: name.to_owned(),
            device_type,
            api_version: vk::API_VERSION_1_3,
            queue_family_flags: families.to_vec(),
        }
    }

    #[test]
    fn discrete_beats_integrated_beats_others() {
        let ranked = rank(vec![
            device("cpu", PhysicalDeviceType::CPU, &[QueueFlags::GRAPHICS]),
            device("igpu", PhysicalDeviceType::INTEGRATED_GPU, &[QueueFlags::GRAPHICS]),
            device("dgpu", PhysicalDeviceType::DISCRETE_GPU, &[QueueFlags::GRAPHICS]),
        ]);
        let names = ranked.iter().map(|pd| pd.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["dgpu", "igpu", "cpu"]);
    }

    #[test]
    fn transfer_queue_breaks_ties() {
        let ranked = rank(vec![
            device("plain", PhysicalDeviceType::INTEGRATED_GPU, &[QueueFlags::GRAPHICS]),
            device(
                "transfer",
                PhysicalDeviceType::INTEGRATED_GPU,
                &[QueueFlags::GRAPHICS, QueueFlags::TRANSFER],
            ),
        ]);
        assert_eq!(ranked[0].name, "transfer");
        assert_eq!(ranked[0].score(), 11);
    }

    #[test]
    fn devices_without_graphics_are_dropped() {
        let ranked = rank(vec![device(
            "compute only",
            PhysicalDeviceType::DISCRETE_GPU,
            &[QueueFlags::COMPUTE],
        )]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn query_goes_through_the_instance_driver() {
        let driver = Rc::new(FakeDriver::new(&[], &[]).with_devices(vec![
            device("igpu", PhysicalDeviceType::INTEGRATED_GPU, &[QueueFlags::GRAPHICS]),
            device("dgpu", PhysicalDeviceType::DISCRETE_GPU, &[QueueFlags::GRAPHICS]),
        ]));
        let instance = InstanceBuilder::new(driver, &AppConfig::from_build_env().unwrap())
            .build("Triangle", AppVersion(1, 0, 0), &ResolvedConfig::default())
            .unwrap();

        let ranked = query_physical_devices(&instance).unwrap();
        assert_eq!(ranked[0].name, "dgpu");
        assert_eq!(
            ranked[0].to_string(),
            "dgpu (DISCRETE_GPU, Vulkan 1.3.0)"
        );
    }
}
