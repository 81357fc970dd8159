/// Maps a venue identifier to its coarse research-area label.
///
/// The mapping is fixed and case-insensitive; anything outside the known
/// venue set falls back to "Other" rather than failing.
pub fn subfield_of(venue: &str) -> &'static str {
    match venue.to_uppercase().as_str() {
        "NIPS" | "NEURIPS" | "ICLR" | "ICML" | "AAAI" | "IJCAI" | "AISTATS" | "CORL"
        | "ACML" => "Artificial Intelligence",
        "ACL" | "EMNLP" | "NAACL" | "COLING" | "ARR" | "COLM" => "Computational Linguistics",
        "SIGGRAPH" | "SIGGRAPHASIA" | "EUROGRAPHICS" => "Computer Graphics",
        "SITCOM" => "Computer Networks and Wireless Communication",
        "CVPR" | "ICCV" | "WACV" | "BMVC" | "3DV" => "Computer Vision and Pattern Recognition",
        "KDD" => "Data Mining and Analysis",
        "WWW" | "SIGIR" => "Databases and Information Systems",
        "ACMMM" => "Multimedia",
        "ICRA" | "IROS" | "RSS" => "Robotics",
        _ => "Other",
    }
}
