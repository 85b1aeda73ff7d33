use std::ffi::{CStr, CString};

use ash::vk::{self, ApplicationInfo, DeviceCreateInfo, DeviceQueueCreateInfo, InstanceCreateInfo};

use crate::config::DeviceConfig;

use super::{find_memorytype_index, VkResultExt, VulkanError, VulkanResult};

const VALIDATION_LAYER: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

/// Queue family indices resolved for the requested queue types.
/// They may alias each other when the device has no dedicated families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
}

/// Owns the instance, the physical and logical device and a command pool on the
/// graphics family. Everything created from a context keeps an `Arc<Context>` so
/// it is destroyed before the device.
pub struct Context {
    _entry: ash::Entry,
    pub instance: ash::Instance,

    pub physical_device: vk::PhysicalDevice,
    pub physical_device_properties: vk::PhysicalDeviceProperties,
    pub physical_device_features: vk::PhysicalDeviceFeatures,
    pub enabled_features: vk::PhysicalDeviceFeatures,
    pub device_memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub supported_extensions: Vec<String>,
    pub queue_family_indices: QueueFamilyIndices,

    pub device: ash::Device,
    pub queue: vk::Queue,
    pub command_pool: vk::CommandPool,
}

impl Context {
    pub fn new(config: &DeviceConfig) -> VulkanResult<Self> {
        let entry = unsafe { ash::Entry::load() }?;

        let instance = create_instance(&entry, config)?;
        let instance_guard = DestroyOnError::new(&instance, |instance: &ash::Instance| unsafe {
            instance.destroy_instance(None)
        });

        let physical_device = find_physical_device(&instance, config.preferred_device_index)?;

        let physical_device_properties =
            unsafe { instance.get_physical_device_properties(physical_device) };
        let physical_device_features =
            unsafe { instance.get_physical_device_features(physical_device) };
        let device_memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let queue_family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let supported_extensions =
            unsafe { instance.enumerate_device_extension_properties(physical_device) }
                .on("vkEnumerateDeviceExtensionProperties")?
                .iter()
                .map(|property| {
                    unsafe { CStr::from_ptr(property.extension_name.as_ptr()) }
                        .to_string_lossy()
                        .into_owned()
                })
                .collect::<Vec<_>>();

        let queue_family_indices = QueueFamilyIndices {
            graphics: queue_family_index(&queue_family_properties, vk::QueueFlags::GRAPHICS)?,
            compute: queue_family_index(&queue_family_properties, vk::QueueFlags::COMPUTE)?,
            transfer: queue_family_index(&queue_family_properties, vk::QueueFlags::TRANSFER)
                .unwrap_or(queue_family_index(
                    &queue_family_properties,
                    vk::QueueFlags::GRAPHICS,
                )?),
        };

        let enabled_features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: physical_device_features.sampler_anisotropy,
            ..Default::default()
        };

        let device = create_logical_device(
            &instance,
            physical_device,
            &queue_family_indices,
            &enabled_features,
        )?;
        let device_guard = DestroyOnError::new(&device, |device: &ash::Device| unsafe {
            device.destroy_device(None)
        });

        let queue = unsafe { device.get_device_queue(queue_family_indices.graphics, 0) };

        let command_pool = {
            let create_info = vk::CommandPoolCreateInfo::builder()
                .queue_family_index(queue_family_indices.graphics)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            unsafe { device.create_command_pool(&create_info, None) }
                .on("vkCreateCommandPool")?
        };

        let device_name =
            unsafe { CStr::from_ptr(physical_device_properties.device_name.as_ptr()) };
        log::info!(
            "Using device {:?} ({:?}), queue families {:?}",
            device_name,
            physical_device_properties.device_type,
            queue_family_indices
        );

        device_guard.disarm();
        instance_guard.disarm();

        Ok(Self {
            _entry: entry,
            instance,

            physical_device,
            physical_device_properties,
            physical_device_features,
            enabled_features,
            device_memory_properties,
            supported_extensions,
            queue_family_indices,

            device,
            queue,
            command_pool,
        })
    }

    pub fn find_memory_type(
        &self,
        memory_requirements: &vk::MemoryRequirements,
        flags: vk::MemoryPropertyFlags,
    ) -> VulkanResult<u32> {
        find_memorytype_index(memory_requirements, &self.device_memory_properties, flags)
            .ok_or(VulkanError::NoMemoryType(flags))
    }

    pub fn extension_supported(&self, extension: &str) -> bool {
        self.supported_extensions.iter().any(|ext| ext == extension)
    }

    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    /// Best depth format for optimal tiling, optionally also usable as a sampled image.
    pub fn supported_depth_format(&self, check_sampling_support: bool) -> VulkanResult<vk::Format> {
        pick_depth_format(check_sampling_support, |format| {
            self.format_properties(format)
        })
    }

    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle() }.on("vkDeviceWaitIdle")
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe { self.device.destroy_command_pool(self.command_pool, None) };

        unsafe { self.device.destroy_device(None) };

        unsafe { self.instance.destroy_instance(None) };
    }
}

/// Destroys a half-built object when construction returns early.
/// `disarm` once ownership moves into the finished value.
struct DestroyOnError<'a, T> {
    value: &'a T,
    destroy: fn(&T),
    armed: bool,
}

impl<'a, T> DestroyOnError<'a, T> {
    fn new(value: &'a T, destroy: fn(&T)) -> Self {
        Self {
            value,
            destroy,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for DestroyOnError<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            (self.destroy)(self.value);
        }
    }
}

/// Prefers a family dedicated to compute (no graphics) for compute requests and a family
/// dedicated to transfer (no graphics, no compute) for transfer requests. Falls back to
/// the first family that supports the flags.
pub fn queue_family_index(
    properties: &[vk::QueueFamilyProperties],
    flags: vk::QueueFlags,
) -> VulkanResult<u32> {
    let position = |predicate: &dyn Fn(vk::QueueFlags) -> bool| {
        properties
            .iter()
            .position(|family| predicate(family.queue_flags))
            .map(|index| index as u32)
    };

    if flags.contains(vk::QueueFlags::COMPUTE) {
        if let Some(index) = position(&|family| {
            family.intersects(flags) && !family.contains(vk::QueueFlags::GRAPHICS)
        }) {
            return Ok(index);
        }
    }

    if flags.contains(vk::QueueFlags::TRANSFER) {
        if let Some(index) = position(&|family| {
            family.intersects(flags)
                && !family.contains(vk::QueueFlags::GRAPHICS)
                && !family.contains(vk::QueueFlags::COMPUTE)
        }) {
            return Ok(index);
        }
    }

    position(&|family| family.intersects(flags)).ok_or(VulkanError::NoQueueFamily(flags))
}

const DEPTH_FORMATS: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

fn pick_depth_format(
    check_sampling_support: bool,
    format_properties: impl Fn(vk::Format) -> vk::FormatProperties,
) -> VulkanResult<vk::Format> {
    DEPTH_FORMATS
        .into_iter()
        .find(|format| {
            let features = format_properties(*format).optimal_tiling_features;
            features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
                && (!check_sampling_support
                    || features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE))
        })
        .ok_or(VulkanError::NoDepthFormat)
}

fn create_instance(entry: &ash::Entry, config: &DeviceConfig) -> VulkanResult<ash::Instance> {
    let application_name = CString::new(config.application_name.replace('\0', ""))
        .unwrap_or_default();

    let app_info = ApplicationInfo::builder()
        .application_name(&application_name)
        .engine_name(&application_name)
        .api_version(vk::API_VERSION_1_3);

    let mut layers = Vec::new();
    if config.enable_validation {
        let available = entry
            .enumerate_instance_layer_properties()
            .on("vkEnumerateInstanceLayerProperties")?;
        let has_validation = available.iter().any(|layer| {
            (unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) }) == VALIDATION_LAYER
        });
        if has_validation {
            layers.push(VALIDATION_LAYER.as_ptr());
        } else {
            log::warn!("Validation requested, but {:?} is not present", VALIDATION_LAYER);
        }
    }

    let create_info = InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_layer_names(&layers);

    unsafe { entry.create_instance(&create_info, None) }.on("vkCreateInstance")
}

fn find_physical_device(
    instance: &ash::Instance,
    preferred_device_index: Option<usize>,
) -> VulkanResult<vk::PhysicalDevice> {
    let physical_devices =
        unsafe { instance.enumerate_physical_devices() }.on("vkEnumeratePhysicalDevices")?;

    let has_graphics_queue = |pd: vk::PhysicalDevice| {
        unsafe { instance.get_physical_device_queue_family_properties(pd) }
            .iter()
            .any(|info| info.queue_flags.contains(vk::QueueFlags::GRAPHICS))
    };

    if let Some(index) = preferred_device_index {
        match physical_devices.get(index) {
            Some(pd) if has_graphics_queue(*pd) => return Ok(*pd),
            _ => log::warn!(
                "Preferred device index {} is not usable, picking automatically",
                index
            ),
        }
    }

    physical_devices
        .into_iter()
        .filter(|pd| has_graphics_queue(*pd))
        .min_by_key(|pd| {
            let device_type = unsafe { instance.get_physical_device_properties(*pd) }.device_type;

            match device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
                vk::PhysicalDeviceType::CPU => 3,
                vk::PhysicalDeviceType::OTHER => 4,
                _ => 5,
            }
        })
        .ok_or(VulkanError::NoSuitableDevice)
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family_indices: &QueueFamilyIndices,
    enabled_features: &vk::PhysicalDeviceFeatures,
) -> VulkanResult<ash::Device> {
    let mut families = vec![
        queue_family_indices.graphics,
        queue_family_indices.compute,
        queue_family_indices.transfer,
    ];
    families.sort_unstable();
    families.dedup();

    let queue_priorities = [1.0];
    let queue_create_infos = families
        .iter()
        .map(|family| {
            DeviceQueueCreateInfo::builder()
                .queue_family_index(*family)
                .queue_priorities(&queue_priorities)
                .build()
        })
        .collect::<Vec<_>>();

    let create_info = DeviceCreateInfo::builder()
        .queue_create_infos(&queue_create_infos)
        .enabled_features(enabled_features);

    unsafe { instance.create_device(physical_device, &create_info, None) }.on("vkCreateDevice")
}
