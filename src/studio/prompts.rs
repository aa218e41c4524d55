//! Prompt templates for the landscape workflows.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Language used for plant names in inventories and infographic labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English only.
    #[default]
    English,
    /// Bahasa Malaysia only.
    Malay,
    /// English and Bahasa Malaysia side by side.
    Both,
}

impl Language {
    /// Returns the lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Malay => "malay",
            Self::Both => "both",
        }
    }

    fn inventory_instruction(&self) -> &'static str {
        match self {
            Self::English => "Respond in English only.",
            Self::Malay => "Respond in Bahasa Malaysia only.",
            Self::Both => {
                "Provide bilingual response. For each item, give both English and Bahasa \
                 Malaysia names and descriptions. Use italic formatting (*text*) for all \
                 Bahasa Malaysia text."
            }
        }
    }

    fn inventory_format(&self) -> &'static str {
        match self {
            Self::English => "1. **[Plant/Tree Name]**: [Short description]",
            Self::Malay => "1. **[Nama Pokok/Tumbuhan]**: [Penerangan ringkas]",
            Self::Both => "1. **[Plant Name] / *[Nama Pokok]***: [Description] / *[Penerangan]*",
        }
    }

    fn label_instruction(&self) -> &'static str {
        match self {
            Self::English => "Label all plants and trees with their common English names only.",
            Self::Malay => "Label all plants and trees with their Bahasa Malaysia names only.",
            Self::Both => {
                "Label all plants and trees bilingually. Format each label with the English \
                 name in regular font on the first line, and the Bahasa Malaysia name in \
                 smaller italic font in parentheses on the second line."
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = crate::UbahLansError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "malay" | "ms" | "bm" => Ok(Self::Malay),
            "both" => Ok(Self::Both),
            other => Err(crate::UbahLansError::InvalidRequest(format!(
                "unknown language: {other}"
            ))),
        }
    }
}

/// Wraps a design description in the structure-preserving edit prompt.
pub fn transformation(description: &str) -> String {
    format!(
        "Edit this photo: Keep ALL walls, windows, doors, and building structures EXACTLY as \
they are. Only modify the landscaping (grass, plants, flowers). {description}.
CRITICAL INSTRUCTION: You MUST overlay CLEAR, VISIBLE WHITE CIRCLES with BLACK NUMBERS (1, 2, 3...) \
on top of the key PLANTS and TREES you add.
- Focus numbering on the greenery (trees, shrubs, flowers).
- Only number major hardscape features if they are central to the design.
- The numbers must be large enough to be read.
- Place them directly on or next to the new items.

Return the edited image."
    )
}

/// Prompt used when the edit fails and a description is the fallback.
pub fn transformation_description(description: &str) -> String {
    format!("Describe a landscape transformation: {description}")
}

/// Prompt for the illustrated, labelled infographic.
pub fn infographic(language: Language) -> String {
    format!(
        "Transform this garden/landscape photo into a simplified illustrated infographic with plant labels.

{labels}

STYLE REQUIREMENTS:
1. Convert to a clean, simplified illustration style (NOT realistic photo)
2. Use MUTED, NATURAL COLORS - avoid bright or oversaturated colors
3. Use soft, natural tones for plants (muted greens, soft pinks, gentle purples, natural browns)
4. Simplify shapes while keeping them recognizable
5. Maintain the overall composition and layout of the original scene

LABELING REQUIREMENTS:
1. Identify all visible plants, trees, flowers, and landscape features
2. Add WHITE RECTANGULAR LABEL BOXES with black text
3. Use ARROWS or lines connecting each label to its corresponding plant/feature
4. For bilingual labels:
   - First line: English name in regular font
   - Second line: (Bahasa Malaysia name) in smaller italic font within parentheses
5. Position labels strategically around the image to avoid overlapping
6. Ensure labels are clearly readable with good contrast

COLOR PALETTE:
- Greens: Muted, natural green tones (not bright lime or neon)
- Flowers: Soft, pastel colors (gentle pinks, purples, blues)
- Trees: Natural browns and muted greens
- Overall: Calm, natural, professional landscape illustration aesthetic

The final result should look like a professional landscape plan illustration with a calm, \
natural color palette and all plants clearly labeled with white boxes and arrows.",
        labels = language.label_instruction()
    )
}

/// Prompt asking a vision model to describe the layout from above.
pub const LAYOUT_ANALYSIS: &str = "Analyze this property image and describe the layout from a top-down perspective:
1. Property boundaries and dimensions
2. Building footprint and structure
3. Current landscape elements and their positions
4. Pathways, driveways, and hardscaping
5. Spatial relationships between elements";

/// Prompt for the architectural plan view.
pub fn top_down(description: &str, layout: &str) -> String {
    format!(
        "Create a professional top-down architectural plan view of this property with the landscape transformation applied.

REQUIREMENTS:
- Bird's eye view / aerial perspective looking straight down
- Architectural style plan with clear boundaries
- Show building footprint, pathways, and all landscape elements
- Professional landscape architecture drawing style
- Include the transformation: {description}

PROPERTY LAYOUT:
{layout}

Generate a clean, professional top-down architectural plan that shows the property layout with \
the new landscape design. Style should be like a landscape architect's plan view."
    )
}

/// Prompt used when the plan view fails and a description is the fallback.
pub fn top_down_description(description: &str) -> String {
    format!("Describe a top-down view of: {description}")
}

/// Prompt for the numbered-marker legend of a transformed image.
pub fn inventory_from_image(language: Language) -> String {
    format!(
        "Look at this landscape design image. Identify the numbered markers (1, 2, 3...) which mark the PLANTS and TREES.

{instruction}

Create a strictly formatted legend list focusing on the vegetation.
DO NOT say \"Okay\" or \"Here is the list\". Start directly with the first item.

Format exactly like this:
{format}
2. **[Plant/Tree Name]**: [Short description]

If there are numbered hardscape features, list them as well, but prioritize the plants.",
        instruction = language.inventory_instruction(),
        format = language.inventory_format()
    )
}

/// Prompt for a text-only inventory built from the design description.
pub fn inventory_from_description(description: &str, language: Language) -> String {
    format!(
        "Based on this landscape transformation description: \"{description}\", create a simple list of plants and features.

{instruction}

DO NOT include any conversational text. Start directly with the list.

Format:
{format}
2. **[Item Name]**: [Short description]",
        instruction = language.inventory_instruction(),
        format = language.inventory_format()
    )
}

/// Prompt asking for one landscape idea for a photo.
pub const SUGGESTION: &str = "Analyze this property image and suggest ONE single, best creative landscape transformation idea.

Provide a concise, descriptive paragraph describing the new design, including specific plants, style, and features.

Do not use bullet points or lists. Just write it as a clear instruction for a designer.";
