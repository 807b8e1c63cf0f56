fn main() {
    use build_script_cfg::Cfg;
    use search_cuda_tools::{find_cuda_root, find_header, find_library};

    println!("cargo:rerun-if-changed=build.rs");

    // 与 cuda、cublas、curand 三个库的探测条件保持一致
    let nvidia = Cfg::new("nvidia");
    let Some(root) = find_cuda_root() else {
        return;
    };
    let headers = ["cuda.h", "cublas_v2.h", "curand.h"];
    let libraries = ["cublas", "curand"];
    if headers.iter().all(|h| find_header(&root, h).is_some())
        && libraries.iter().all(|l| find_library(&root, l).is_some())
    {
        nvidia.define();
    }
}
