//! Built-in compute program.
//!
//! The program is compiled during initialization to prove the
//! context/program/queue pipeline works. Nothing here launches it.

/// Entry point defined by [`MATMUL_SOURCE`].
pub const MATMUL_ENTRY: &str = "gemm_naive";

/// Naive column-major matrix multiply, `C = A * B` with `A: MxK`, `B: KxN`.
pub const MATMUL_SOURCE: &str = r#"
__kernel void gemm_naive(const int M, const int N, const int K,
                         const __global float* A,
                         const __global float* B,
                         __global float* C) {
    const int row = get_global_id(0);
    const int col = get_global_id(1);
    float acc = 0.0f;
    for (int k = 0; k < K; k++) {
        acc += A[k * M + row] * B[col * K + k];
    }
    C[col * M + row] = acc;
}
"#;
