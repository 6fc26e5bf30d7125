use std::collections::BTreeMap;
use std::fmt::Write as _;

/// System message sent with chat-completion requests.
pub const SYSTEM_MESSAGE: &str = "You are a supply chain expert providing detailed analysis.";

/// Input for one full analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: u32,
    /// Question id → answer.
    pub clarifications: BTreeMap<String, String>,
}

impl AnalysisRequest {
    pub fn new(item_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_name: item_name.into(),
            description: None,
            quantity,
            clarifications: BTreeMap::new(),
        }
    }

    /// The user prompt: five analysis dimensions, product details, the
    /// user's clarifications, and the JSON shape the answer must follow.
    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "\nAnalyze the supply chain for: {item}\n\n{DIMENSIONS}\nProduct Details:\n- Item: {item}\n- Quantity: {quantity}\n",
            item = self.item_name,
            quantity = self.quantity,
        );

        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(prompt, "- Description: {description}");
        }

        if !self.clarifications.is_empty() {
            prompt.push_str("\nUser Clarifications:\n");
            for (key, value) in &self.clarifications {
                let _ = writeln!(prompt, "- {key}: {value}");
            }
        }

        prompt.push_str(RESPONSE_SCHEMA);
        prompt
    }
}

const DIMENSIONS: &str = "\
Please provide a comprehensive supply chain analysis including:

1. **Materials Analysis**:
   - Primary raw materials and their sources
   - Key components and sub-assemblies
   - Material extraction and processing steps

2. **Manufacturing Process**:
   - Main manufacturing steps and processes
   - Energy requirements and types
   - Typical manufacturing locations/regions

3. **Transportation & Logistics**:
   - Transportation modes between stages
   - Typical distances and routes
   - Packaging requirements

4. **Key Companies & Suppliers**:
   - Major manufacturers in this industry
   - Key supplier regions
   - Notable supply chain risks

5. **Environmental Impact Factors**:
   - High carbon-intensity processes
   - Material extraction impacts
   - Transportation emissions
   - End-of-life considerations
";

const RESPONSE_SCHEMA: &str = r#"
Please respond in JSON format with the following structure:
{
  "materials": [
    {
      "name": "material name",
      "type": "raw_material|component|assembly",
      "source_regions": ["region1", "region2"],
      "carbon_intensity": "low|medium|high"
    }
  ],
  "processes": [
    {
      "name": "process name",
      "type": "extraction|processing|manufacturing|assembly",
      "energy_requirement": "energy amount and type",
      "location": "typical location",
      "energy_consumption_kwh": "estimated kWh per unit, if known",
      "carbon_emissions": "estimated CO2 kg"
    }
  ],
  "transportation": [
    {
      "from": "source",
      "to": "destination",
      "mode": "truck|ship|air|rail",
      "distance_km": 1000,
      "carbon_emissions": "estimated CO2 kg"
    }
  ],
  "companies": [
    {
      "name": "company name",
      "role": "manufacturer|supplier|distributor",
      "region": "primary region"
    }
  ],
  "environmental_impact": {
    "total_carbon_footprint_kg": 0.0,
    "highest_impact_stage": "stage name",
    "improvement_opportunities": ["opportunity1", "opportunity2"]
  },
  "summary": "Brief summary of the supply chain analysis"
}
"#;
