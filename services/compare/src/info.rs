use serde::Serialize;

/// Static description of the comparison algorithm and its provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmInfo {
    pub algorithm_name: &'static str,
    pub algorithm_version: &'static str,
    pub algorithm_modality: &'static str,
    pub company_name: &'static str,
    pub technical_contact_email: &'static str,
    #[serde(rename = "RecommendedCPUs")]
    pub recommended_cpus: u32,
    /// Recommended memory in megabytes
    pub recommended_mem: u32,
}

impl AlgorithmInfo {
    pub const fn current() -> Self {
        Self {
            algorithm_name: "Rekognition CompareFaces",
            algorithm_version: "1.0",
            algorithm_modality: "Face",
            company_name: "Amazon Web Services",
            technical_contact_email: "biometrics@facematch.example",
            recommended_cpus: 1,
            recommended_mem: 512,
        }
    }
}
