//! Default step catalog shipped with the system, mirroring the deployed
//! configuration: fifteen steps, an opening parallel cohort ("A") that
//! only exists on the LS branch, and one more LS-only step for the
//! overpayment return to the state treasury.

use crate::models::{Applicability, EmployeeRole, NewStepConfiguration};

fn step(
    step_number: i32,
    step_name: &str,
    required_employee_role: EmployeeRole,
    description: &str,
    applicability: Applicability,
    parallel_group: Option<&str>,
) -> NewStepConfiguration {
    NewStepConfiguration {
        step_number,
        step_name: step_name.to_string(),
        description: description.to_string(),
        required_employee_role,
        applicability,
        is_parallel: parallel_group.is_some(),
        parallel_group: parallel_group.map(str::to_string),
    }
}

/// The default fifteen-step catalog.
pub fn default_step_catalog() -> Vec<NewStepConfiguration> {
    use Applicability::{Both, LsOnly};
    use EmployeeRole::*;

    vec![
        step(
            1,
            "Verifikator",
            Ver,
            "Membuat rekapitulasi biaya perjalanan dinas berdasarkan Surat Tugas dan Nota Dinas Anggaran",
            LsOnly,
            Some("A"),
        ),
        step(
            2,
            "Petugas Pembuat Rincian Biaya PD",
            Pprbpd,
            "Membuat daftar nominatif biaya perjalanan dinas",
            LsOnly,
            Some("A"),
        ),
        step(
            3,
            "Operator Komitmen",
            Ok,
            "Memasukkan nilai permohonan anggaran biaya ke aplikasi SAKTI",
            LsOnly,
            Some("A"),
        ),
        step(4, "Operator SPM", Ospm, "Mengecek ketersediaan anggaran", LsOnly, None),
        step(
            5,
            "Operator Pembayaran",
            Op,
            "Memasukkan nilai permohonan anggaran biaya ke aplikasi SAKTI",
            LsOnly,
            None,
        ),
        step(
            6,
            "Verifikator",
            Ver,
            "Memeriksa kelengkapan berkas perjalanan dinas dari pelaksana perjalanan dinas. Pilih status selisih: Nihil/Kurang/Lebih",
            Both,
            None,
        ),
        step(
            7,
            "Petugas Pembuat Rincian Biaya PD",
            Pprbpd,
            "Membuat rincian biaya perjalanan dinas",
            Both,
            None,
        ),
        step(
            8,
            "Verifikator",
            Ver,
            "Memeriksa rincian biaya perjalanan dinas",
            Both,
            None,
        ),
        step(
            9,
            "Operator SPBy",
            Ospby,
            "Memeriksa rincian biaya perjalanan dinas dibandingkan dengan permohonan anggaran biaya awal apakah ada selisih lebih untuk pengembalian atau tidak",
            Both,
            None,
        ),
        step(
            10,
            "Bendahara Pengeluaran",
            Bp,
            "Menandatangani kuitansi dll berkas perjalanan dinas",
            Both,
            None,
        ),
        step(
            11,
            "Pejabat Pembuat Komitmen",
            Ppk,
            "Menandatangani kuitansi dll berkas perjalanan dinas",
            Both,
            None,
        ),
        step(
            12,
            "Pelaksana Perjalanan Dinas",
            Ppd,
            "Menandatangani kuitansi dll berkas perjalanan dinas",
            Both,
            None,
        ),
        step(
            13,
            "Admin Digit Kemenkeu",
            Adk,
            "Melakukan pengembalian selisih kelebihan anggaran ke MPN G3 Modul Penerimaan Negara versi G3 (Khusus LS)",
            LsOnly,
            None,
        ),
        step(
            14,
            "Kepala Sub Bagian Umum",
            Ksbu,
            "Menandatangani kuitansi dll berkas perjalanan dinas",
            Both,
            None,
        ),
        step(
            15,
            "Petugas Arsip Berkas PD",
            Pabpd,
            "Mengarsipkan kuitansi dll berkas perjalanan dinas",
            Both,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_dense_from_one() {
        let catalog = default_step_catalog();
        assert_eq!(catalog.len(), 15);
        for (index, step) in catalog.iter().enumerate() {
            assert_eq!(step.step_number, index as i32 + 1);
        }
    }

    #[test]
    fn opening_cohort_is_ls_only() {
        let catalog = default_step_catalog();
        for step in catalog.iter().take(3) {
            assert_eq!(step.parallel_group.as_deref(), Some("A"));
            assert!(step.is_parallel);
            assert_eq!(step.applicability, Applicability::LsOnly);
        }
    }
}
