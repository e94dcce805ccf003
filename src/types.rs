//! Resource type tags
//!
//! Every resource carries a numeric type tag from a fixed enumeration.
//! Tags map to human-readable names used for the per-type output folders
//! and back again; unknown tags are rendered as `0x<HEX>`.

use crate::stream::Platform;

/// Highest tag in the known enumeration. Entries with a larger tag are
/// rejected by validation.
pub const MAX_KNOWN_TAG: u32 = 0x11004;

// Sorted ascending by tag for binary search.
static RESOURCE_TYPES: &[(u32, &str)] = &[
    (0x0, "Texture"),
    (0x1, "Material"),
    (0x2, "RenderableMesh"),
    (0x3, "TextFile"),
    (0x4, "DrawIndexParams"),
    (0x5, "IndexBuffer"),
    (0x6, "MeshState"),
    (0x7, "TextureAuxInfo"),
    (0x8, "VertexBufferItem"),
    (0x9, "VertexBuffer"),
    (0xA, "VertexDescriptor"),
    (0xB, "MaterialCRC32"),
    (0xC, "Renderable"),
    (0xD, "MaterialTechnique"),
    (0xE, "TextureState"),
    (0xF, "MaterialState"),
    (0x10, "DepthStencilState"),
    (0x11, "RasterizerState"),
    (0x12, "ShaderProgramBuffer"),
    (0x13, "RenderTargetState"),
    (0x14, "ShaderParameter"),
    (0x15, "RenderableAssembly"),
    (0x16, "Debug"),
    (0x17, "KdTree"),
    (0x18, "VoiceHierarchy"),
    (0x19, "Snr"),
    (0x1A, "InterpreterData"),
    (0x1B, "AttribSysSchema"),
    (0x1C, "AttribSysVault"),
    (0x1D, "EntryList"),
    (0x1E, "AptData"),
    (0x1F, "GuiPopup"),
    (0x21, "Font"),
    (0x22, "LuaCode"),
    (0x23, "InstanceList"),
    (0x24, "ClusteredMesh"),
    (0x25, "IdList"),
    (0x26, "InstanceCollisionList"),
    (0x27, "Language"),
    (0x28, "SatNavTile"),
    (0x29, "SatNavTileDirectory"),
    (0x2A, "Model"),
    (0x2B, "ColourCube"),
    (0x2C, "HudMessage"),
    (0x2D, "HudMessageList"),
    (0x2E, "HudMessageSequence"),
    (0x2F, "HudMessageSequenceDictionary"),
    (0x30, "WorldPainter2D"),
    (0x31, "PFXHookBundle"),
    (0x32, "Shader"),
    (0x40, "RawFile"),
    (0x41, "ICETakeDictionary"),
    (0x42, "VideoData"),
    (0x43, "PolygonSoupList"),
    (0x44, "DeveloperList"),
    (0x45, "CommsToolListDefinition"),
    (0x46, "CommsToolList"),
    (0x50, "BinaryFile"),
    (0x51, "AnimationCollection"),
    (0x2710, "CharAnimBankFile"),
    (0x2711, "WeaponFile"),
    (0x343E, "VFXFile"),
    (0x343F, "BearFile"),
    (0x3A98, "BkPropInstanceList"),
    (0xA000, "Registry"),
    (0xA010, "GenericRwacFactoryConfiguration"),
    (0xA020, "GenericRwacWaveContent"),
    (0xA021, "GinsuWaveContent"),
    (0xA022, "AemsBank"),
    (0xA023, "Csis"),
    (0xA024, "Nicotine"),
    (0xA025, "Splicer"),
    (0xA026, "FreqContent"),
    (0xA027, "VoiceHierarchyCollection"),
    (0xA028, "GenericRwacReverbIRContent"),
    (0xA029, "SnapshotData"),
    (0xB000, "ZoneList"),
    (0xC001, "VFX"),
    (0x10000, "LoopModel"),
    (0x10001, "AISections"),
    (0x10002, "TrafficData"),
    (0x10003, "TriggerData"),
    (0x10004, "DeformationModel"),
    (0x10005, "VehicleList"),
    (0x10006, "GraphicsSpec"),
    (0x10007, "PhysicsSpec"),
    (0x10008, "ParticleDescriptionCollection"),
    (0x10009, "WheelList"),
    (0x1000A, "WheelGraphicsSpec"),
    (0x1000B, "TextureNameMap"),
    (0x1000C, "ICEList"),
    (0x1000D, "ICEData"),
    (0x1000E, "ProgressionData"),
    (0x1000F, "PropPhysics"),
    (0x10010, "PropGraphicsList"),
    (0x10011, "PropInstanceData"),
    (0x10012, "EnvironmentKeyframe"),
    (0x10013, "EnvironmentTimeLine"),
    (0x10014, "EnvironmentDictionary"),
    (0x10015, "GraphicsStub"),
    (0x10016, "StaticSoundMap"),
    (0x10017, "PFXHookBundle"),
    (0x10018, "StreetData"),
    (0x10019, "VFXMeshCollection"),
    (0x1001A, "MassiveLookupTable"),
    (0x1001B, "VFXPropCollection"),
    (0x1001C, "StreamedDeformationSpec"),
    (0x1001D, "ParticleDescription"),
    (0x1001E, "PlayerCarColours"),
    (0x1001F, "ChallengeList"),
    (0x10020, "FlaptFile"),
    (0x10021, "ProfileUpgrade"),
    (0x10022, "OfflineChallengeList"),
    (0x10023, "VehicleAnimation"),
    (0x10024, "BodypartRemapData"),
    (0x10025, "LUAList"),
    (0x10026, "LUAScript"),
    (0x11000, "BkSoundWeapon"),
    (0x11001, "BkSoundGunsu"),
    (0x11002, "BkSoundBulletImpact"),
    (0x11003, "BkSoundBulletImpactList"),
    (0x11004, "BkSoundBulletImpactStream"),
];

/// Human-readable name for a type tag, or `None` if unrecognised.
///
/// Tag 0x32 is `Shader` on PC and `ShaderTechnique` on the console
/// targets; the tag value itself is identical everywhere.
pub fn name_of(tag: u32, platform: Platform) -> Option<&'static str> {
    if tag == 0x32 && platform != Platform::Pc {
        return Some("ShaderTechnique");
    }
    RESOURCE_TYPES
        .binary_search_by_key(&tag, |&(t, _)| t)
        .ok()
        .map(|i| RESOURCE_TYPES[i].1)
}

/// Reverse lookup from a name to its tag.
pub fn tag_of(name: &str) -> Option<u32> {
    if name == "ShaderTechnique" {
        return Some(0x32);
    }
    RESOURCE_TYPES
        .iter()
        .find(|&&(_, n)| n == name)
        .map(|&(t, _)| t)
}

/// Folder name used when sorting extracted resources by type.
/// Unrecognised tags fall back to `0x<HEX>`.
pub fn dir_name(tag: u32, platform: Platform) -> String {
    match name_of(tag, platform) {
        Some(name) => name.to_owned(),
        None => format!("0x{tag:X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in RESOURCE_TYPES.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
        assert_eq!(RESOURCE_TYPES.last().unwrap().0, MAX_KNOWN_TAG);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(name_of(0x0, Platform::Pc), Some("Texture"));
        assert_eq!(name_of(0x22, Platform::Pc), Some("LuaCode"));
        assert_eq!(name_of(0x2710, Platform::Pc), Some("CharAnimBankFile"));
        assert_eq!(
            name_of(0x11004, Platform::Pc),
            Some("BkSoundBulletImpactStream")
        );
        assert_eq!(name_of(0x20, Platform::Pc), None);
        assert_eq!(name_of(0x33, Platform::Pc), None);
    }

    #[test]
    fn test_shader_alias_by_platform() {
        assert_eq!(name_of(0x32, Platform::Pc), Some("Shader"));
        assert_eq!(name_of(0x32, Platform::X360), Some("ShaderTechnique"));
        assert_eq!(name_of(0x32, Platform::Ps3), Some("ShaderTechnique"));
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(tag_of("Texture"), Some(0x0));
        assert_eq!(tag_of("Shader"), Some(0x32));
        assert_eq!(tag_of("ShaderTechnique"), Some(0x32));
        assert_eq!(tag_of("NoSuchType"), None);
    }

    #[test]
    fn test_dir_name_fallback() {
        assert_eq!(dir_name(0x3, Platform::Pc), "TextFile");
        assert_eq!(dir_name(0x33, Platform::Pc), "0x33");
        assert_eq!(dir_name(0xABC, Platform::Pc), "0xABC");
    }
}
